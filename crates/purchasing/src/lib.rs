//! Raw-material purchase orders (event-sourced).
//!
//! Receiving a purchase order emits the received lines; booking the stock
//! into inventory happens in the application layer.

pub mod order;

pub use order::{
    AddLine, CancelPurchaseOrder, CreatePurchaseOrder, GoodsReceived, LineItem, NewPurchaseLine,
    PlaceOrder,
    PurchaseOrder, PurchaseOrderCancelled, PurchaseOrderCommand, PurchaseOrderCreated,
    PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderLineAdded, PurchaseOrderPlaced,
    PurchaseOrderStatus, ReceiveGoods,
};
