//! Data models for clinic and store entities.
//!
//! This module contains the records exchanged with the REST API:
//!
//! - `Product`, `Stock`, `InventoryMovement`: catalog and inventory
//! - `Sale`, `SaleItem`, `SalesStats`: sales history and aggregates
//! - `DeliveryOrder`: dispatch of delivery sales
//! - `Tutor`, `UserSummary`: customers and staff accounts
//! - `Exam`, `ExamFile`: patient exams and their attachments
//!
//! The backend stores documents in MongoDB, so identifiers may arrive as
//! either `id` or `_id`.

pub mod delivery;
pub mod exam;
pub mod inventory;
pub mod person;
pub mod product;
pub mod sale;

pub use delivery::DeliveryOrder;
pub use exam::{DownloadedFile, Exam, ExamDraft, ExamFile};
pub use inventory::{InventoryMovement, MovementType, Stock};
pub use person::{Tutor, UserSummary};
pub use product::{Product, ProductKind, ProductQuery};
pub use sale::{Sale, SaleChannel, SaleItem, SalesStats};
