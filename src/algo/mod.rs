/// Table-based agents
pub mod tabular;
