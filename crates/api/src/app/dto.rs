//! Request bodies and query strings. Money is always integer paise.

use chrono::NaiveDate;
use serde::Deserialize;

use loomworks_inventory::RawMaterialId;
use loomworks_parties::{ContactInfo, CustomerType, PartyId};
use loomworks_pricing::PricingInput;
use loomworks_production::WastageEntry;
use loomworks_products::{Dimensions, ProductId, QualityGrade, RecipeLine};

// -------------------------
// Customers & suppliers
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreatePartyRequest {
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub gstin: Option<String>,
    pub company_name: Option<String>,
    pub customer_type: Option<CustomerType>,
}

/// Contact fields are merged into the stored contact one by one.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePartyRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub gstin: Option<String>,
    pub company_name: Option<String>,
    pub customer_type: Option<CustomerType>,
}

impl UpdatePartyRequest {
    pub fn has_contact_changes(&self) -> bool {
        self.email.is_some()
            || self.phone.is_some()
            || self.address.is_some()
            || self.city.is_some()
            || self.state.is_some()
            || self.pincode.is_some()
    }

    pub fn merged_contact(&self, current: &ContactInfo) -> ContactInfo {
        let pick = |new: &Option<String>, old: &Option<String>| new.clone().or_else(|| old.clone());
        ContactInfo {
            email: pick(&self.email, &current.email),
            phone: pick(&self.phone, &current.phone),
            address: pick(&self.address, &current.address),
            city: pick(&self.city, &current.city),
            state: pick(&self.state, &current.state),
            pincode: pick(&self.pincode, &current.pincode),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SuspendPartyRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

// -------------------------
// Raw materials
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateMaterialRequest {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub supplier_id: Option<PartyId>,
    pub cost_per_unit: u64,
    #[serde(default)]
    pub reorder_level: f64,
    #[serde(default)]
    pub opening_stock: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMaterialRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub supplier_id: Option<PartyId>,
    pub cost_per_unit: Option<u64>,
    pub reorder_level: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StockMovementRequest {
    pub quantity: f64,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CorrectStockRequest {
    pub new_stock: f64,
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaterialListQuery {
    pub status: Option<String>,
}

// -------------------------
// Products
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub color: Option<String>,
    pub pattern: Option<String>,
    pub dimensions: Dimensions,
    pub selling_price: u64,
    /// Falls back to the configured default rate.
    pub gst_rate: Option<f64>,
    pub description: Option<String>,
    #[serde(default)]
    pub recipe: Vec<RecipeLine>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub pattern: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub selling_price: Option<u64>,
    pub gst_rate: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRecipeRequest {
    pub lines: Vec<RecipeLine>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct RequirementsQuery {
    pub quantity: u32,
}

// -------------------------
// Individual products
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PieceListQuery {
    pub product_id: Option<String>,
    pub status: Option<String>,
    pub batch_id: Option<String>,
    pub order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkDamagedRequest {
    pub reason: String,
}

// -------------------------
// Production
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PlanBatchRequest {
    pub product_id: ProductId,
    pub order_id: Option<String>,
    pub planned_quantity: u32,
    pub priority: Option<String>,
    pub planned_start: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct StartMachineRequest {
    pub machine: String,
    pub operator: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordWastageRequest {
    pub entries: Vec<WastageEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteBatchRequest {
    pub produced_quantity: u32,
    #[serde(default)]
    pub quality_grade: QualityGrade,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchListQuery {
    pub status: Option<String>,
    pub product_id: Option<String>,
    pub order_id: Option<String>,
}

// -------------------------
// Orders
// -------------------------

/// Price and GST rate default to the product's current values.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Option<u64>,
    pub gst_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: PartyId,
    #[serde(default)]
    pub lines: Vec<OrderLineRequest>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: u64,
    pub method: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

// -------------------------
// Purchase orders
// -------------------------

/// Unit cost defaults to the material's current cost.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseLineRequest {
    pub material_id: RawMaterialId,
    pub quantity: f64,
    pub unit_cost: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: PartyId,
    #[serde(default)]
    pub lines: Vec<PurchaseLineRequest>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseOrderListQuery {
    pub status: Option<String>,
    pub supplier_id: Option<String>,
}

// -------------------------
// Dropdowns, notifications, pricing, export
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct DropdownListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<usize>,
}

/// Calculator input; naming a product fills in its recipe cost when the
/// caller did not send one.
#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    #[serde(flatten)]
    pub input: PricingInput,
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Deserialize)]
pub struct GstRequest {
    pub amount: f64,
    pub gst_rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub value: f64,
    pub from: String,
    #[serde(default = "default_target_unit")]
    pub to: String,
}

fn default_target_unit() -> String {
    "m".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}
