use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("source_path", DataType::Utf8, false),
		Field::new("filename", DataType::Utf8, false),
		Field::new("is_permanent", DataType::Boolean, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
