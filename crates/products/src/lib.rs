//! Product catalogue, per-SQM recipes and individually tagged pieces.

pub mod individual;
pub mod product;
pub mod recipe;

pub use individual::{
    IndividualProduct, IndividualProductCommand, IndividualProductEvent, IndividualProductId,
    MarkPieceDamaged, PieceDamaged, PieceRegistered, PieceReleased, PieceReserved, PieceSold,
    PieceStatus, QR_PREFIX, QualityGrade, RegisterPiece, ReleasePiece, ReservePiece, SellPiece,
    qr_payload, serial_from_scan,
};
pub use product::{
    ArchiveProduct, CreateProduct, Dimensions, Product, ProductArchived, ProductCommand,
    ProductCreated, ProductEvent, ProductId, ProductStatus, ProductUpdated, RecipeSet, SetRecipe,
    UpdateProduct, normalize_sku,
};
pub use recipe::{MaterialRequirement, Recipe, RecipeLine};
