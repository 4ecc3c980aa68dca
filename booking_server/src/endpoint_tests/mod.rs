mod helpers;

mod cal;
mod checkout;
mod stripe;
