use chrono::NaiveDate;
use fieldx::fxstruct;

#[fxstruct(no_new, builder, get(copy))]
#[derive(Clone, Debug)]
pub struct Order {
    /// The order id.
    id:          u32,
    /// The customer id.
    customer_id: u32,
    /// The product id.
    product_id:  u32,
    /// The quantity of the product.
    quantity:    u32,
    /// The day the order was placed.
    order_date:  NaiveDate,
}
