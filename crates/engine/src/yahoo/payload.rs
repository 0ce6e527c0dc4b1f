//! Yahoo Finance response shapes and their normalization into domain types.

use chrono::DateTime;
use serde::Deserialize;

use common::{Error, Fundamentals, PriceSeries, RawBar, Result};

// ─── Chart (daily bars) ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

/// Parse a `v8/finance/chart` body. Rows with a missing close, high or low
/// are dropped; a ticker with no rows yields an empty series.
pub fn parse_chart(ticker: &str, body: &str) -> Result<PriceSeries> {
    let resp: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = resp.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Err(Error::NoData(ticker.to_string()));
        }
        return Err(Error::Provider(format!("chart error for {ticker}: {err}")));
    }

    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::empty(ticker));
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let at = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();
    let rows = result.timestamp.iter().enumerate().map(|(i, &ts)| RawBar {
        date: DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()),
        open: at(&quote.open, i),
        high: at(&quote.high, i),
        low: at(&quote.low, i),
        close: at(&quote.close, i),
        volume: at(&quote.volume, i),
    });

    Ok(PriceSeries::from_raw(ticker, rows))
}

// ─── Quote summary (fundamentals) ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryData,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    summary_detail: Option<SummaryDetail>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatistics>,
    #[serde(default)]
    financial_data: Option<FinancialData>,
    #[serde(default)]
    asset_profile: Option<AssetProfile>,
    #[serde(default)]
    fund_profile: Option<FundProfile>,
}

/// Yahoo wraps numbers as `{"raw": 0.12, "fmt": "12%"}` and uses `{}` for
/// "not reported".
#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(v: Option<RawValue>) -> Option<f64> {
    v.and_then(|v| v.raw).filter(|x| x.is_finite())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(rename = "forwardPE", default)]
    forward_pe: Option<RawValue>,
    #[serde(default)]
    dividend_yield: Option<RawValue>,
    /// ETFs report their distribution yield here instead of `dividendYield`.
    #[serde(rename = "yield", default)]
    fund_yield: Option<RawValue>,
    #[serde(default)]
    total_assets: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    #[serde(rename = "forwardPE", default)]
    forward_pe: Option<RawValue>,
    #[serde(default)]
    annual_report_expense_ratio: Option<RawValue>,
    #[serde(default)]
    total_assets: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    #[serde(default)]
    return_on_equity: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetProfile {
    #[serde(default)]
    sector: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundProfile {
    #[serde(default)]
    fees_expenses_investment: Option<FundFees>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundFees {
    #[serde(default)]
    annual_report_expense_ratio: Option<RawValue>,
}

/// Parse a `v10/finance/quoteSummary` body into a partial snapshot.
pub fn parse_summary(ticker: &str, body: &str) -> Result<Fundamentals> {
    let resp: SummaryResponse = serde_json::from_str(body)?;

    if let Some(err) = resp.quote_summary.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Err(Error::NoData(ticker.to_string()));
        }
        if err.code.eq_ignore_ascii_case("Unauthorized") {
            return Err(Error::Unauthorized(format!("quoteSummary for {ticker}: {err}")));
        }
        return Err(Error::Provider(format!("quoteSummary error for {ticker}: {err}")));
    }

    let result = resp
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .unwrap_or_default();

    let detail = result.summary_detail.unwrap_or_default();
    let stats = result.default_key_statistics.unwrap_or_default();
    let fees = result
        .fund_profile
        .and_then(|p| p.fees_expenses_investment)
        .unwrap_or_default();

    Ok(Fundamentals {
        forward_pe: raw(detail.forward_pe).or(raw(stats.forward_pe)),
        return_on_equity: result.financial_data.and_then(|f| raw(f.return_on_equity)),
        sector: result
            .asset_profile
            .and_then(|p| p.sector)
            .filter(|s| !s.trim().is_empty()),
        expense_ratio: raw(stats.annual_report_expense_ratio)
            .or(raw(fees.annual_report_expense_ratio)),
        dividend_yield: raw(detail.dividend_yield).or(raw(detail.fund_yield)),
        total_assets: raw(detail.total_assets).or(raw(stats.total_assets)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "SPY"},
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [472.2, 470.4, null],
                        "high":   [473.6, 471.1, 470.0],
                        "low":    [470.4, 468.1, 467.3],
                        "close":  [472.6, 468.7, null],
                        "volume": [123, 456, 789]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn chart_rows_without_close_are_dropped() {
        let series = parse_chart("SPY", CHART).unwrap();
        assert_eq!(series.ticker, "SPY");
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[1].close, 468.7);
        assert_eq!(series.bars[0].date.to_string(), "2024-01-02");
    }

    #[test]
    fn chart_not_found_is_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse_chart("GONE", body), Err(Error::NoData(t)) if t == "GONE"));
    }

    #[test]
    fn chart_without_result_is_empty() {
        let body = r#"{"chart":{"result":[],"error":null}}"#;
        assert!(parse_chart("NONE", body).unwrap().is_empty());
    }

    #[test]
    fn summary_for_stock() {
        let body = r#"{"quoteSummary":{"result":[{
            "summaryDetail": {"forwardPE": {"raw": 18.4, "fmt": "18.40"}, "dividendYield": {}},
            "financialData": {"returnOnEquity": {"raw": 0.153, "fmt": "15.30%"}},
            "assetProfile": {"sector": "Technology"}
        }],"error":null}}"#;
        let f = parse_summary("MSFT", body).unwrap();
        assert_eq!(f.forward_pe, Some(18.4));
        assert_eq!(f.return_on_equity, Some(0.153));
        assert_eq!(f.sector.as_deref(), Some("Technology"));
        assert_eq!(f.dividend_yield, None, "empty raw wrapper means absent");
        assert_eq!(f.expense_ratio, None);
    }

    #[test]
    fn summary_for_etf_uses_fund_fields() {
        let body = r#"{"quoteSummary":{"result":[{
            "summaryDetail": {"yield": {"raw": 0.0131}, "totalAssets": {"raw": 5.1e11}},
            "fundProfile": {"feesExpensesInvestment": {"annualReportExpenseRatio": {"raw": 0.000945}}}
        }],"error":null}}"#;
        let f = parse_summary("SPY", body).unwrap();
        assert_eq!(f.dividend_yield, Some(0.0131));
        assert_eq!(f.total_assets, Some(5.1e11));
        assert_eq!(f.expense_ratio, Some(0.000945));
        assert_eq!(f.forward_pe, None);
    }

    #[test]
    fn invalid_crumb_is_unauthorized() {
        let body = r#"{"quoteSummary":{"result":null,"error":{"code":"Unauthorized","description":"Invalid Crumb"}}}"#;
        assert!(matches!(
            parse_summary("SPY", body),
            Err(Error::Unauthorized(msg)) if msg.contains("Invalid Crumb")
        ));
    }

    #[test]
    fn other_summary_errors_are_provider_errors() {
        let body = r#"{"quoteSummary":{"result":null,"error":{"code":"Internal Server Error","description":"try later"}}}"#;
        assert!(matches!(parse_summary("SPY", body), Err(Error::Provider(_))));
    }
}
