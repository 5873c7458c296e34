// Domain layer - Tags, values, formulas and the time window
pub mod formula;
pub mod series;
pub mod tag;
pub mod value;
pub mod window;
