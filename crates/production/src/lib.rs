//! Production batches: planning, loom (machine) stage, wastage capture and
//! completion into individual pieces.
//!
//! Stock is drawn and pieces are registered by the API layer around these
//! commands; the batch itself only records what happened.

pub mod batch;

pub use batch::{
    BatchCancelled, BatchCommand, BatchCompleted, BatchEvent, BatchId, BatchPlanned, BatchStatus,
    CancelBatch, CompleteBatch, MachineStarted, PlanBatch, ProductionBatch, RecordWastage,
    StartMachine, WastageEntry, WastageRecorded, wastage_percent, yield_percent,
};
