pub mod entity;

use chrono::Days;
use chrono::NaiveDate;
use entity::Customer;
use entity::Order;
use entity::Product;
use fake::faker::name::en::FirstName;
use fake::faker::name::en::LastName;
use fake::Fake;
use fieldx::fxstruct;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::Bernoulli;
use rand_distr::Distribution;
use strum::VariantArray;
use tracing::debug;
use tracing::info;
use tracing::instrument;

use crate::types::reperr;
use crate::types::Category;
use crate::types::City;
use crate::types::Gender;
use crate::types::ReportError;
use crate::types::Result;

/// Generate the synthetic customers, products and orders tables.
///
/// All randomness comes from a single [`StdRng`] seeded with [`seed`](Self::seed), so the same configuration always
/// produces the same dataset. Tables are generated in the order customers, products, orders.
#[derive(Debug, Clone)]
#[fxstruct(no_new, builder, get(copy))]
pub struct DataGenerator {
    #[fieldx(default(42))]
    seed: u64,

    #[fieldx(default(500))]
    customer_count: u32,

    #[fieldx(default(50))]
    product_count: u32,

    #[fieldx(default(2_000))]
    order_count: u32,

    /// Orders are placed on days of this year, Jan 1 to Dec 31 inclusive.
    #[fieldx(default(2023))]
    year: i32,

    #[fieldx(default(18))]
    min_age: u32,
    #[fieldx(default(59))]
    max_age: u32,

    #[fieldx(default(50))]
    min_price: u32,
    #[fieldx(default(1_999))]
    max_price: u32,

    /// Upper bound of the items per order. The lower bound is always 1.
    #[fieldx(default(4))]
    max_quantity: u32,

    /// Probability of a customer being male.
    #[fieldx(default(0.6))]
    male_share: f64,
}

/// The generated tables. IDs are 1-based and equal to the position in the table plus one.
#[derive(Debug, Clone)]
pub struct Dataset {
    customers: Vec<Customer>,
    products:  Vec<Product>,
    orders:    Vec<Order>,
}

impl Dataset {
    pub fn new(customers: Vec<Customer>, products: Vec<Product>, orders: Vec<Order>) -> Self {
        Self {
            customers,
            products,
            orders,
        }
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}

impl DataGenerator {
    fn validate(&self) -> Result<()> {
        if self.customer_count == 0 || self.product_count == 0 || self.order_count == 0 {
            return Err(ReportError::config(format!(
                "customer, product and order counts must be positive; got {}/{}/{}",
                self.customer_count, self.product_count, self.order_count
            )));
        }
        if self.min_age > self.max_age {
            return Err(ReportError::config(format!(
                "min age {} is above max age {}",
                self.min_age, self.max_age
            )));
        }
        if self.min_price > self.max_price {
            return Err(ReportError::config(format!(
                "min price {} is above max price {}",
                self.min_price, self.max_price
            )));
        }
        if self.max_quantity == 0 {
            return Err(ReportError::config("max quantity must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.male_share) {
            return Err(ReportError::config(format!(
                "male share must be within [0, 1]; got {}",
                self.male_share
            )));
        }
        Ok(())
    }

    /// First and last day of the order period.
    pub fn period(&self) -> Result<(NaiveDate, NaiveDate)> {
        let first = NaiveDate::from_ymd_opt(self.year, 1, 1)
            .ok_or_else(|| ReportError::config(format!("year {} is out of range", self.year)))?;
        let last = NaiveDate::from_ymd_opt(self.year, 12, 31)
            .ok_or_else(|| ReportError::config(format!("year {} is out of range", self.year)))?;
        Ok((first, last))
    }

    #[instrument(level = "debug", skip(self), fields(seed = self.seed))]
    pub fn generate(&self) -> Result<Dataset> {
        self.validate()?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let customers = self.generate_customers(&mut rng)?;
        let products = self.generate_products(&mut rng)?;
        let orders = self.generate_orders(&mut rng, &customers, &products)?;

        info!(
            "Generated {} customers, {} products, {} orders",
            customers.len(),
            products.len(),
            orders.len()
        );

        Ok(Dataset::new(customers, products, orders))
    }

    fn generate_customers(&self, rng: &mut StdRng) -> Result<Vec<Customer>> {
        let gender_dist = Bernoulli::new(self.male_share).map_err(ReportError::config)?;
        let mut customers = Vec::with_capacity(self.customer_count as usize);

        for id in 1..=self.customer_count {
            let first_name: String = FirstName().fake_with_rng(rng);
            let last_name: String = LastName().fake_with_rng(rng);
            let gender = if gender_dist.sample(rng) {
                Gender::Male
            }
            else {
                Gender::Female
            };

            customers.push(
                Customer::builder()
                    .id(id)
                    .first_name(first_name)
                    .last_name(last_name)
                    .age(rng.random_range(self.min_age..=self.max_age))
                    .gender(gender)
                    .city(City::VARIANTS[rng.random_range(0..City::VARIANTS.len())])
                    .build()?,
            );
        }

        debug!("{} customers generated", customers.len());
        Ok(customers)
    }

    fn generate_products(&self, rng: &mut StdRng) -> Result<Vec<Product>> {
        let mut products = Vec::with_capacity(self.product_count as usize);

        for id in 1..=self.product_count {
            products.push(
                Product::builder()
                    .id(id)
                    .category(Category::VARIANTS[rng.random_range(0..Category::VARIANTS.len())])
                    .price(rng.random_range(self.min_price..=self.max_price))
                    .build()?,
            );
        }

        debug!("{} products generated", products.len());
        Ok(products)
    }

    fn generate_orders(&self, rng: &mut StdRng, customers: &[Customer], products: &[Product]) -> Result<Vec<Order>> {
        let (first_day, last_day) = self.period()?;
        let days = (last_day - first_day).num_days() as u64 + 1;
        let mut orders = Vec::with_capacity(self.order_count as usize);

        for id in 1..=self.order_count {
            // Foreign keys are drawn from the generated tables, never invented.
            let customer_id = customers[rng.random_range(0..customers.len())].id();
            let product_id = products[rng.random_range(0..products.len())].id();
            let offset = rng.random_range(0..days);
            let order_date = first_day
                .checked_add_days(Days::new(offset))
                .ok_or_else(|| reperr!("order day {offset} overflows year {}", self.year))?;

            orders.push(
                Order::builder()
                    .id(id)
                    .customer_id(customer_id)
                    .product_id(product_id)
                    .quantity(rng.random_range(1..=self.max_quantity))
                    .order_date(order_date)
                    .build()?,
            );
        }

        debug!("{} orders generated", orders.len());
        Ok(orders)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    fn default_dataset() -> Dataset {
        DataGenerator::builder().build().unwrap().generate().unwrap()
    }

    #[test]
    fn test_table_sizes() {
        let dataset = default_dataset();
        assert_eq!(dataset.customers().len(), 500);
        assert_eq!(dataset.products().len(), 50);
        assert_eq!(dataset.orders().len(), 2000);
    }

    #[test]
    fn test_value_ranges() {
        let dataset = default_dataset();

        for customer in dataset.customers() {
            assert!((18..=59).contains(&customer.age()), "customer age {}", customer.age());
            assert!(matches!(customer.gender(), Gender::Male | Gender::Female));
            assert!(!customer.first_name().is_empty());
        }

        for product in dataset.products() {
            assert!((50..=1999).contains(&product.price()), "product price {}", product.price());
        }

        let first = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        for order in dataset.orders() {
            assert!((1..=4).contains(&order.quantity()));
            assert!(order.order_date() >= first && order.order_date() <= last);
        }
    }

    #[test]
    fn test_leap_year() {
        let generator = DataGenerator::builder().year(2024).order_count(20_000).build().unwrap();
        let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(generator.period().unwrap(), (first, last));

        let dataset = generator.generate().unwrap();
        let dates: HashSet<NaiveDate> = dataset.orders().iter().map(|o| o.order_date()).collect();
        assert!(dates.iter().all(|d| *d >= first && *d <= last));
        assert!(dates.contains(&last), "Dec 31 is never drawn");
        assert!(dates.contains(&NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert_eq!(dates.len(), 366);
    }

    #[test]
    fn test_unique_ids_and_foreign_keys() {
        let dataset = default_dataset();
        let customer_ids: HashSet<u32> = dataset.customers().iter().map(|c| c.id()).collect();
        let product_ids: HashSet<u32> = dataset.products().iter().map(|p| p.id()).collect();
        let order_ids: HashSet<u32> = dataset.orders().iter().map(|o| o.id()).collect();

        assert_eq!(customer_ids.len(), 500);
        assert_eq!(product_ids.len(), 50);
        assert_eq!(order_ids.len(), 2000);
        assert!(customer_ids.contains(&1) && customer_ids.contains(&500));

        for order in dataset.orders() {
            assert!(customer_ids.contains(&order.customer_id()));
            assert!(product_ids.contains(&order.product_id()));
        }
    }

    #[test]
    fn test_gender_share() {
        let dataset = DataGenerator::builder()
            .customer_count(5_000)
            .order_count(1)
            .build()
            .unwrap()
            .generate()
            .unwrap();
        let males = dataset
            .customers()
            .iter()
            .filter(|c| c.gender() == Gender::Male)
            .count();
        let share = males as f64 / 5_000.0;
        assert!((0.55..0.65).contains(&share), "male share {share}");
    }

    #[test]
    fn test_determinism() {
        let first = default_dataset();
        let second = default_dataset();

        let summary = |ds: &Dataset| -> Vec<(u32, u32, u32, NaiveDate)> {
            ds.orders()
                .iter()
                .map(|o| (o.customer_id(), o.product_id(), o.quantity(), o.order_date()))
                .collect()
        };
        assert_eq!(summary(&first), summary(&second));
        assert_eq!(
            first.customers()[7].full_name(),
            second.customers()[7].full_name()
        );

        let other = DataGenerator::builder().seed(7).build().unwrap().generate().unwrap();
        assert_ne!(summary(&first), summary(&other));
    }

    #[test]
    fn test_invalid_configuration() {
        let generator = DataGenerator::builder().min_age(40).max_age(30).build().unwrap();
        assert!(matches!(generator.generate(), Err(ReportError::Config(_))));

        let generator = DataGenerator::builder().order_count(0).build().unwrap();
        assert!(matches!(generator.generate(), Err(ReportError::Config(_))));

        let generator = DataGenerator::builder().male_share(1.5).build().unwrap();
        assert!(matches!(generator.generate(), Err(ReportError::Config(_))));
    }
}
