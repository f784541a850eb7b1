//! Customer orders (event-sourced).
//!
//! Business rules only: line editing, the fulfilment status walk and payment
//! tracking. No IO, no HTTP, no storage.

pub mod order;

pub use order::{
    AddLine, CancelOrder, ChangeStatus, ConfirmOrder, CreateOrder, LineAdded, LineRemoved,
    NewOrderLine, Order, OrderCancelled, OrderCommand, OrderConfirmed, OrderCreated, OrderEvent,
    OrderId, OrderLine, OrderStatus, OrderStatusChanged, OrderTotals, PaymentRecorded,
    PaymentStatus, RecordPayment, RemoveLine, totals_for,
};
