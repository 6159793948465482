pub mod portfolio;

pub use portfolio::{NewPortfolio, Portfolio, PortfolioChanges, PortfolioView};
