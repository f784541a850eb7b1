//! Raw-material inventory (event-sourced).
//!
//! Every stock movement is an event carrying the resulting balance, so the
//! read model never has to re-add deltas.

pub mod material;

pub use material::{
    ConsumeStock, CorrectStock, CreateMaterial, LowStockReached, MaterialCreated, MaterialUpdated,
    RawMaterial, RawMaterialCommand, RawMaterialEvent, RawMaterialId, ReceiveStock, StockConsumed,
    StockCorrected, StockReceived, StockStatus, UpdateMaterial, round_quantity,
};
