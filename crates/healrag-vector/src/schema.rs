use arrow_schema::{Schema, Field, DataType};
use std::sync::Arc;

/// Row layout of the persisted base index. `position` preserves insertion
/// order so that vector ids map back to the same-position chunk on load.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("position", DataType::Int32, false),
		Field::new("source", DataType::Utf8, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
