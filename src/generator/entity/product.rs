use fieldx::fxstruct;

use crate::types::Category;

#[derive(Clone, Debug)]
#[fxstruct(no_new, builder, get(copy))]
pub struct Product {
    /// Unique product ID, starting at 1.
    id:       u32,
    category: Category,
    /// Unit price in whole currency units.
    price:    u32,
}
