pub mod account;
pub mod faculty;
pub mod period;
pub mod role;
pub mod salary;
