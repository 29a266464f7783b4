pub mod check_email;
pub mod invoke;
pub mod serve;
