use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::generator::entity::Customer;
use crate::generator::entity::Order;
use crate::generator::entity::Product;
use crate::generator::Dataset;
use crate::types::AgeGroup;
use crate::types::Category;
use crate::types::City;
use crate::types::Gender;

/// A single order joined with its customer and product, plus the derived columns.
#[derive(Clone, Debug, PartialEq)]
pub struct SalesRow {
    pub order_id:    u32,
    pub customer_id: u32,
    pub product_id:  u32,
    pub quantity:    u32,
    pub order_date:  NaiveDate,
    pub age:         u32,
    pub gender:      Gender,
    pub city:        City,
    pub category:    Category,
    pub price:       u32,
    /// `quantity * price`
    pub total_price: u64,
    /// `None` when the customer's age is outside of all buckets.
    pub age_group:   Option<AgeGroup>,
    /// Order month as `YYYY-MM`.
    pub order_month: String,
}

impl SalesRow {
    pub fn new(order: &Order, customer: &Customer, product: &Product) -> Self {
        Self {
            order_id:    order.id(),
            customer_id: customer.id(),
            product_id:  product.id(),
            quantity:    order.quantity(),
            order_date:  order.order_date(),
            age:         customer.age(),
            gender:      customer.gender(),
            city:        customer.city(),
            category:    product.category(),
            price:       product.price(),
            total_price: order.quantity() as u64 * product.price() as u64,
            age_group:   AgeGroup::from_age(customer.age()),
            order_month: order.order_date().format("%Y-%m").to_string(),
        }
    }
}

/// The joined orders table.
#[derive(Clone, Debug, Default)]
pub struct SalesFrame {
    rows: Vec<SalesRow>,
}

impl SalesFrame {
    pub fn from_rows(rows: Vec<SalesRow>) -> Self {
        Self { rows }
    }

    /// Inner join of orders with customers and products. Orders referencing unknown keys are dropped.
    #[instrument(level = "debug", skip_all)]
    pub fn join(dataset: &Dataset) -> Self {
        let customers: HashMap<u32, &Customer> = dataset.customers().iter().map(|c| (c.id(), c)).collect();
        let products: HashMap<u32, &Product> = dataset.products().iter().map(|p| (p.id(), p)).collect();

        let mut rows = Vec::with_capacity(dataset.orders().len());
        let mut dropped = 0;

        for order in dataset.orders() {
            match (customers.get(&order.customer_id()), products.get(&order.product_id())) {
                (Some(customer), Some(product)) => rows.push(SalesRow::new(order, customer, product)),
                _ => {
                    dropped += 1;
                    debug!(
                        "Order {} has no match for customer {} or product {}",
                        order.id(),
                        order.customer_id(),
                        order.product_id()
                    );
                }
            }
        }

        if dropped > 0 {
            warn!("{dropped} orders dropped by the join");
        }

        let ungrouped = rows.iter().filter(|r| r.age_group.is_none()).count();
        if ungrouped > 0 {
            warn!("{ungrouped} rows have an age outside of all age groups");
        }

        debug!("Joined {} rows", rows.len());
        Self { rows }
    }

    pub fn rows(&self) -> &[SalesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::generator::DataGenerator;

    #[test]
    fn test_join_keeps_every_order() {
        let dataset = DataGenerator::builder().build().unwrap().generate().unwrap();
        let frame = SalesFrame::join(&dataset);

        assert_eq!(frame.len(), dataset.orders().len());
        for row in frame.rows() {
            assert_eq!(row.total_price, row.quantity as u64 * row.price as u64);
            assert!(row.age_group.is_some());
            assert_eq!(row.order_month.len(), 7);
            assert!(row.order_month.starts_with("2023-"));
        }
    }

    #[test]
    fn test_join_drops_dangling_orders() {
        let customer = Customer::builder()
            .id(1)
            .first_name("Ada".to_string())
            .last_name("Lovelace".to_string())
            .age(30)
            .gender(Gender::Female)
            .city(City::Giza)
            .build()
            .unwrap();
        let product = Product::builder()
            .id(1)
            .category(Category::Books)
            .price(120)
            .build()
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2023, 3, 9).unwrap();
        let order = |id, customer_id, product_id| {
            Order::builder()
                .id(id)
                .customer_id(customer_id)
                .product_id(product_id)
                .quantity(3)
                .order_date(date)
                .build()
                .unwrap()
        };

        let dataset = Dataset::new(vec![customer], vec![product], vec![
            order(1, 1, 1),
            order(2, 2, 1),
            order(3, 1, 2),
        ]);
        let frame = SalesFrame::join(&dataset);

        assert_eq!(frame.len(), 1);
        let row = &frame.rows()[0];
        assert_eq!(row.order_id, 1);
        assert_eq!(row.total_price, 360);
        assert_eq!(row.age_group, Some(AgeGroup::From26To35));
        assert_eq!(row.order_month, "2023-03");
        assert_eq!(row.gender, Gender::Female);
    }
}
