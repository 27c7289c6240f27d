pub mod bom;
