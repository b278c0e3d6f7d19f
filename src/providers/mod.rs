pub mod alpha_vantage;
pub mod finnhub;
pub mod nse;
pub mod twelve_data;
pub mod util;
pub mod yahoo;
