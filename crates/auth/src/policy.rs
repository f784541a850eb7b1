//! Built-in role policy.
//!
//! | role         | grants                                                        |
//! |--------------|---------------------------------------------------------------|
//! | `admin`      | `*`                                                           |
//! | `manager`    | read + write on every area                                    |
//! | `production` | read + write on production, inventory, products               |
//! | `sales`      | read on customers, orders, products; write on customers, orders |
//! | `viewer`     | read on every area                                            |
//!
//! Every role may also read pricing and mark its own notifications read.

use crate::{Permission, Role};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Area {
    Customers,
    Suppliers,
    Inventory,
    Products,
    Production,
    Orders,
    PurchaseOrders,
    Dropdowns,
    Notifications,
    Pricing,
}

impl Area {
    pub const ALL: [Area; 10] = [
        Area::Customers,
        Area::Suppliers,
        Area::Inventory,
        Area::Products,
        Area::Production,
        Area::Orders,
        Area::PurchaseOrders,
        Area::Dropdowns,
        Area::Notifications,
        Area::Pricing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Area::Customers => "customers",
            Area::Suppliers => "suppliers",
            Area::Inventory => "inventory",
            Area::Products => "products",
            Area::Production => "production",
            Area::Orders => "orders",
            Area::PurchaseOrders => "purchase_orders",
            Area::Dropdowns => "dropdowns",
            Area::Notifications => "notifications",
            Area::Pricing => "pricing",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
        }
    }
}

fn read_write(areas: &[Area]) -> Vec<Permission> {
    areas
        .iter()
        .flat_map(|a| [Permission::read(*a), Permission::write(*a)])
        .collect()
}

fn baseline() -> Vec<Permission> {
    vec![
        Permission::read(Area::Pricing),
        Permission::read(Area::Notifications),
        Permission::write(Area::Notifications),
    ]
}

pub fn permissions_for_role(role: &Role) -> Vec<Permission> {
    let mut perms = match role.as_str() {
        "admin" => return vec![Permission::WILDCARD],
        "manager" => read_write(&Area::ALL),
        "production" => read_write(&[Area::Production, Area::Inventory, Area::Products]),
        "sales" => vec![
            Permission::read(Area::Customers),
            Permission::write(Area::Customers),
            Permission::read(Area::Orders),
            Permission::write(Area::Orders),
            Permission::read(Area::Products),
        ],
        "viewer" => Area::ALL.iter().map(|a| Permission::read(*a)).collect(),
        _ => return Vec::new(),
    };
    for p in baseline() {
        if !perms.contains(&p) {
            perms.push(p);
        }
    }
    perms
}

/// Union of the permissions of every role, without duplicates.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for role in roles {
        for p in permissions_for_role(role) {
            if !out.contains(&p) {
                out.push(p);
            }
        }
    }
    out
}
