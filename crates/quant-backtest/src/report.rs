//! Backtest report generation.

use std::cmp::Ordering;
use std::fmt::Write;

use crate::BacktestResult;

const RULE: &str = "═══════════════════════════════════════════════════════════\n";
const SECTION: &str = "───────────────────────────────────────────────────────────\n";

impl BacktestResult {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str(RULE);
        let _ = writeln!(s, "  BACKTEST: {} on {}", self.strategy_id, self.symbol);
        let _ = writeln!(
            s,
            "  {} to {} ({} bars)",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d"),
            self.bars
        );
        s.push_str(RULE);
        s.push('\n');

        s.push_str("PERFORMANCE\n");
        s.push_str(SECTION);
        let _ = writeln!(s, "  Initial Capital:     ${:.2}", self.initial_capital);
        let _ = writeln!(s, "  Final Capital:       ${:.2}", self.final_capital);
        let _ = writeln!(s, "  Net PnL:             ${:.2}", self.net_pnl);
        let _ = writeln!(s, "  Total Return:        {:.2}%", self.total_return * 100.0);
        let _ = writeln!(s, "  Annualized Return:   {:.2}%", self.annualized_return * 100.0);
        let _ = writeln!(s, "  Max Drawdown:        {:.2}%", self.max_drawdown * 100.0);
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str(SECTION);
        let _ = writeln!(s, "  Sharpe Ratio:        {:.2}", self.sharpe_ratio);
        let _ = writeln!(s, "  Sortino Ratio:       {:.2}", self.sortino_ratio);
        let _ = writeln!(s, "  Calmar Ratio:        {:.2}", self.calmar_ratio);
        let _ = writeln!(s, "  Profit Factor:       {:.2}", self.profit_factor);
        let _ = writeln!(s, "  Kelly Fraction:      {:.2}%", self.kelly_fraction * 100.0);
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str(SECTION);
        let _ = writeln!(s, "  Total Trades:        {}", self.total_trades);
        let _ = writeln!(s, "  Winning Trades:      {}", self.winning_trades);
        let _ = writeln!(s, "  Losing Trades:       {}", self.losing_trades);
        let _ = writeln!(s, "  Win Rate:            {:.2}%", self.win_rate * 100.0);
        let _ = writeln!(s, "  Avg Win:             ${:.2}", self.avg_win);
        let _ = writeln!(s, "  Avg Loss:            ${:.2}", self.avg_loss);
        let _ = writeln!(s, "  Expectancy:          ${:.2}", self.expectancy);
        s.push('\n');

        s.push_str("COSTS\n");
        s.push_str(SECTION);
        let _ = writeln!(s, "  Commission:          ${:.2}", self.total_commission);
        let _ = writeln!(s, "  Slippage:            ${:.2}", self.total_slippage);
        let _ = writeln!(s, "  Tax:                 ${:.2}", self.total_tax);
        s.push('\n');

        s.push_str(RULE);
        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export the equity curve as CSV.
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,capital\n");
        for point in &self.equity_curve {
            let _ = writeln!(csv, "{},{}", point.timestamp.to_rfc3339(), point.capital);
        }
        csv
    }
}

/// One summary block per result, then a ranking by total return.
pub fn generate_performance_report(results: &[BacktestResult]) -> String {
    if results.is_empty() {
        return "No backtest results.\n".to_string();
    }

    let mut s = String::new();
    for result in results {
        s.push_str(&result.summary());
        s.push('\n');
    }

    let mut ranked: Vec<&BacktestResult> = results.iter().collect();
    ranked.sort_by(|a, b| {
        b.total_return
            .partial_cmp(&a.total_return)
            .unwrap_or(Ordering::Equal)
    });

    s.push_str("RANKING BY NET RETURN\n");
    s.push_str(SECTION);
    for (rank, result) in ranked.iter().enumerate() {
        let _ = writeln!(
            s,
            "  {:>2}. {:<20} {:<8} {:>8.2}%  sharpe {:>6.2}  trades {:>4}",
            rank + 1,
            result.strategy_id,
            result.symbol,
            result.total_return * 100.0,
            result.sharpe_ratio,
            result.total_trades
        );
    }
    s
}
