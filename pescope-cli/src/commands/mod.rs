pub mod common;
pub mod dump;
pub mod exports;
pub mod imports;
pub mod info;
pub mod obj;
pub mod scan;
pub mod sections;
