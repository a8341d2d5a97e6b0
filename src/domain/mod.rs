//! Domain layer: persistent entities and the inbound catalog payload model.

pub mod catalog;
pub mod entities;

pub use catalog::{Catalog, CatalogItem, CatalogVariant, StoreInfo};
pub use entities::{
    CatalogUpload, Merchant, PriceEntry, Product, StockStatus, SyncLog, SyncStatus, UploadStatus,
};
