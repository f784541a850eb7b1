//! Spreadsheet downloads of the list views.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Serialize;

use loomworks_auth::{Area, Permission};
use loomworks_core::TenantId;
use loomworks_infra::projections::{
    BatchFilter, BatchReadModel, MaterialReadModel, OrderFilter, OrderReadModel, PartyReadModel,
    ProductReadModel, ProjectionSet, PurchaseOrderReadModel,
};
use loomworks_parties::{PartyId, PartyKind};
use loomworks_reporting::{
    ExportFormat, Exportable, export_csv, format_date, format_datetime, format_inr_paise, ist,
};

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::require;
use crate::app::{dto, services::AppServices};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new().route("/:entity", get(export))
}

/// Lower-case wire name of a serde enum.
fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn money(paise: u64) -> String {
    format_inr_paise(i64::try_from(paise).unwrap_or(i64::MAX))
}

fn party_name(projections: &ProjectionSet, tenant_id: TenantId, id: &PartyId) -> String {
    projections
        .parties
        .get(tenant_id, id)
        .map(|p| p.name)
        .unwrap_or_default()
}

struct PartyRow(PartyReadModel);

impl Exportable for PartyRow {
    fn headers() -> &'static [&'static str] {
        &["Name", "Company", "Email", "Phone", "City", "State", "Pincode", "GSTIN", "Status", "Created"]
    }

    fn row(&self) -> Vec<String> {
        let p = &self.0;
        vec![
            p.name.clone(),
            text(&p.company_name),
            text(&p.contact.email),
            text(&p.contact.phone),
            text(&p.contact.city),
            text(&p.contact.state),
            text(&p.contact.pincode),
            text(&p.gstin),
            label(&p.status),
            format_datetime(p.created_at),
        ]
    }
}

struct ProductRow(ProductReadModel);

impl Exportable for ProductRow {
    fn headers() -> &'static [&'static str] {
        &["SKU", "Name", "Category", "Color", "Pattern", "Size", "SQM per unit", "Selling price", "GST %", "Status"]
    }

    fn row(&self) -> Vec<String> {
        let p = &self.0;
        vec![
            p.sku.clone(),
            p.name.clone(),
            p.category.clone(),
            text(&p.color),
            text(&p.pattern),
            p.dimensions.label(),
            format!("{:.2}", p.sqm_per_unit),
            money(p.selling_price),
            format!("{}", p.gst_rate),
            label(&p.status),
        ]
    }
}

struct MaterialRow(MaterialReadModel);

impl Exportable for MaterialRow {
    fn headers() -> &'static [&'static str] {
        &["Name", "Category", "Unit", "Stock", "Reorder level", "Status", "Cost per unit", "Stock value"]
    }

    fn row(&self) -> Vec<String> {
        let m = &self.0;
        vec![
            m.name.clone(),
            m.category.clone(),
            m.unit.clone(),
            format!("{:.3}", m.stock),
            format!("{:.3}", m.reorder_level),
            m.stock_status.as_str().to_string(),
            money(m.cost_per_unit),
            money(m.stock_value()),
        ]
    }
}

struct OrderRow {
    order: OrderReadModel,
    customer: String,
}

impl Exportable for OrderRow {
    fn headers() -> &'static [&'static str] {
        &["Order No", "Customer", "Status", "Total", "GST", "Paid", "Outstanding", "Payment", "Expected delivery", "Created"]
    }

    fn row(&self) -> Vec<String> {
        let o = &self.order;
        vec![
            o.order_number.clone(),
            self.customer.clone(),
            o.status.as_str().to_string(),
            money(o.totals.total),
            money(o.totals.gst),
            money(o.totals.paid),
            money(o.totals.outstanding),
            o.payment_status.as_str().to_string(),
            o.expected_delivery.map(format_date).unwrap_or_default(),
            format_datetime(o.created_at),
        ]
    }
}

struct PurchaseOrderRow {
    po: PurchaseOrderReadModel,
    supplier: String,
}

impl Exportable for PurchaseOrderRow {
    fn headers() -> &'static [&'static str] {
        &["PO No", "Supplier", "Status", "Lines", "Total cost", "Expected delivery", "Created", "Received"]
    }

    fn row(&self) -> Vec<String> {
        let po = &self.po;
        vec![
            po.po_number.clone(),
            self.supplier.clone(),
            po.status.as_str().to_string(),
            po.lines.len().to_string(),
            money(po.total_cost),
            po.expected_delivery.map(format_date).unwrap_or_default(),
            format_datetime(po.created_at),
            po.received_at.map(format_datetime).unwrap_or_default(),
        ]
    }
}

struct BatchRow {
    batch: BatchReadModel,
    sku: String,
}

impl Exportable for BatchRow {
    fn headers() -> &'static [&'static str] {
        &["Batch No", "SKU", "Status", "Planned", "Produced", "Machine", "Yield %", "Wastage %", "Created"]
    }

    fn row(&self) -> Vec<String> {
        let b = &self.batch;
        vec![
            b.batch_number.clone(),
            self.sku.clone(),
            b.status.as_str().to_string(),
            b.planned_quantity.to_string(),
            b.produced_quantity.to_string(),
            text(&b.machine),
            b.yield_percent.map(|y| format!("{y:.1}")).unwrap_or_default(),
            format!("{:.1}", b.wastage_percent),
            format_datetime(b.created_at),
        ]
    }
}

fn attachment<T: Exportable>(rows: &[T], format: ExportFormat, stem: &str) -> ApiResult {
    let body = export_csv(rows, format).map_err(errors::export_error_to_response)?;
    let date = Utc::now().with_timezone(&ist()).format("%Y%m%d");
    let file_name = format.file_name(&format!("{stem}-{date}"));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
        .into_response())
}

pub async fn export(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(entity): Path<String>,
    Query(q): Query<dto::ExportQuery>,
) -> ApiResult {
    let format: ExportFormat = q
        .format
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(errors::export_error_to_response)?;
    let t = tenant.tenant_id();
    let projections = services.projections();
    let guard = |area: Area| -> Result<(), Response> { require(&tenant, &principal, Permission::read(area)) };

    match entity.as_str() {
        "customers" | "suppliers" => {
            let (kind, area) = if entity == "customers" {
                (PartyKind::Customer, Area::Customers)
            } else {
                (PartyKind::Supplier, Area::Suppliers)
            };
            guard(area)?;
            let rows: Vec<_> = projections.parties.list(t, kind).into_iter().map(PartyRow).collect();
            attachment(&rows, format, &entity)
        }
        "products" => {
            guard(Area::Products)?;
            let rows: Vec<_> = projections.products.list(t, true).into_iter().map(ProductRow).collect();
            attachment(&rows, format, &entity)
        }
        "raw-materials" => {
            guard(Area::Inventory)?;
            let rows: Vec<_> = projections
                .raw_materials
                .list(t, None)
                .into_iter()
                .map(MaterialRow)
                .collect();
            attachment(&rows, format, &entity)
        }
        "orders" => {
            guard(Area::Orders)?;
            let rows: Vec<_> = projections
                .orders
                .list(t, OrderFilter::default())
                .into_iter()
                .map(|order| OrderRow {
                    customer: party_name(projections, t, &order.customer_id),
                    order,
                })
                .collect();
            attachment(&rows, format, &entity)
        }
        "purchase-orders" => {
            guard(Area::PurchaseOrders)?;
            let rows: Vec<_> = projections
                .purchase_orders
                .list(t, None, None)
                .into_iter()
                .map(|po| PurchaseOrderRow {
                    supplier: party_name(projections, t, &po.supplier_id),
                    po,
                })
                .collect();
            attachment(&rows, format, &entity)
        }
        "production-batches" => {
            guard(Area::Production)?;
            let rows: Vec<_> = projections
                .batches
                .list(t, BatchFilter::default())
                .into_iter()
                .map(|batch| BatchRow {
                    sku: projections
                        .products
                        .get(t, &batch.product_id)
                        .map(|p| p.sku)
                        .unwrap_or_default(),
                    batch,
                })
                .collect();
            attachment(&rows, format, &entity)
        }
        other => Err(errors::not_found(&format!("export '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_uses_the_wire_name() {
        assert_eq!(label(&loomworks_parties::PartyStatus::Suspended), "suspended");
    }

    #[test]
    fn money_is_rupees_with_indian_grouping() {
        assert_eq!(money(123_456_750), "₹12,34,567.50");
    }
}
