// Boundary to the external SQL parser and the column-binding metadata it needs
pub mod metadata;
pub mod parser;
pub mod tables;

pub use metadata::{EmptySchemaMetaData, SchemaMetaData, StaticSchemaMetaData};
pub use parser::SqlStatementParser;
pub use tables::{ColumnRef, TablesContext, assignment_columns, object_name_to_table};
