//! Profit report: sales joined with their products, tallied by the pricing rule.

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("sale {sale_id}: product has no list price")]
    MissingListPrice { sale_id: i64 },
    #[error("sale {sale_id}: no quantity")]
    MissingQuantity { sale_id: i64 },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// One sale joined with its product's list price.
#[derive(Clone, Debug, Default, PartialEq, sqlx::FromRow)]
pub struct SaleLine {
    pub sale_id: i64,
    pub quantity: Option<i64>,
    pub list_price: Option<f64>,
    pub special_price: Option<f64>,
    pub sold_price: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ProfitTally {
    pub total: f64,
    pub count: usize,
}

const SALE_LINES_SQL: &str = "SELECT s.\"id\" AS sale_id, s.\"quantity\" AS quantity, p.\"list_price\" AS list_price, \
     s.\"special_price\" AS special_price, s.\"sold_price\" AS sold_price \
     FROM \"sale\" s JOIN \"product\" p ON s.\"product_id\" = p.\"id\" ORDER BY s.\"id\"";

/// A price of zero counts as absent.
fn present(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p != 0.0)
}

/// Contribution of one line: special over list, else sold over list, else list times quantity.
/// The last branch yields revenue, not profit.
pub fn line_contribution(line: &SaleLine) -> Result<f64, ReportError> {
    let list = line
        .list_price
        .ok_or(ReportError::MissingListPrice { sale_id: line.sale_id })?;
    let quantity = line
        .quantity
        .ok_or(ReportError::MissingQuantity { sale_id: line.sale_id })? as f64;
    Ok(if let Some(special) = present(line.special_price) {
        (special - list) * quantity
    } else if let Some(sold) = present(line.sold_price) {
        (sold - list) * quantity
    } else {
        list * quantity
    })
}

pub fn tally_profit(lines: &[SaleLine]) -> Result<ProfitTally, ReportError> {
    let mut total = 0.0;
    for line in lines {
        total += line_contribution(line)?;
    }
    Ok(ProfitTally {
        total,
        count: lines.len(),
    })
}

/// Load every sale with a product and tally it. Sales whose product is gone are not counted.
pub async fn profits_from_sales(pool: &SqlitePool) -> Result<ProfitTally, ReportError> {
    tracing::debug!(sql = SALE_LINES_SQL, "query");
    let lines: Vec<SaleLine> = sqlx::query_as(SALE_LINES_SQL).fetch_all(pool).await?;
    let tally = tally_profit(&lines)?;
    tracing::info!(total = tally.total, count = tally.count, "profit report");
    Ok(tally)
}
