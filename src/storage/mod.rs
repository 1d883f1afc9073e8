//! On-disk storage: tuples, slotted heap pages, heap files, and the
//! catalog that ties table ids to their files.

pub mod catalog;
pub mod heap_file;
pub mod heap_page;
pub mod tuple;

pub use catalog::Catalog;
pub use heap_file::{HeapFile, HeapFileScan};
pub use heap_page::HeapPage;
pub use tuple::{Field, FieldType, RecordId, Tuple, TupleDesc, TEXT_LEN};
