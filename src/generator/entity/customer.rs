use fieldx::fxstruct;

use crate::types::City;
use crate::types::Gender;

#[derive(Clone, Debug)]
#[fxstruct(no_new, builder, get(copy))]
pub struct Customer {
    /// Unique customer ID, starting at 1.
    id:         u32,
    #[fieldx(get(copy(off)))]
    first_name: String,
    #[fieldx(get(copy(off)))]
    last_name:  String,
    age:        u32,
    gender:     Gender,
    city:       City,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
