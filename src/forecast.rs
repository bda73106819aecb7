//! Monthly funding forecast.
//!
//! Fits an additive model `y(t) = intercept + slope * t + season[month]` to the
//! monthly totals of a filtered view and projects it a fixed number of months
//! past the last observed month.
//!
//! The yearly term is only estimated once the series covers two full years;
//! shorter series get a pure linear trend. Intervals come from the residual
//! standard deviation and widen with the forecast step.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::data::aggregate::monthly_totals;
use crate::data::filter::FilteredView;
use crate::data::model::YearMonth;
use crate::error::{DataError, Result};

/// Months projected beyond the last observed month.
pub const FORECAST_HORIZON: usize = 12;

/// Minimum series length (in months) before a yearly term is fitted.
const SEASONAL_MIN_MONTHS: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastConfig {
    pub horizon: usize,
    /// Coverage of the uncertainty interval, e.g. `0.8` for 80%.
    pub interval_width: f64,
    pub yearly_seasonality: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: FORECAST_HORIZON,
            interval_width: 0.80,
            yearly_seasonality: true,
        }
    }
}

/// One row of the forecast table. `actual` is `None` for projected months.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub month: YearMonth,
    pub actual: Option<f64>,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ForecastPoint {
    pub fn is_forecast(&self) -> bool {
        self.actual.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Historical months first, then `horizon` projected months.
    pub points: Vec<ForecastPoint>,
    pub last_observed: YearMonth,
    pub interval_width: f64,
    pub seasonal: bool,
}

impl Forecast {
    pub fn history(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| !p.is_forecast())
    }

    pub fn future(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.is_forecast())
    }
}

// ---------------------------------------------------------------------------
// Monthly resampling
// ---------------------------------------------------------------------------

/// Contiguous monthly totals from the earliest to the latest observed month.
/// Input may be in any order; repeated months are summed and months without
/// rounds are filled with zero.
pub fn fill_months(observed: &[(YearMonth, f64)]) -> Vec<(YearMonth, f64)> {
    let mut totals: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for &(month, value) in observed {
        *totals.entry(month).or_default() += value;
    }
    let (Some(&first), Some(&last)) = (totals.keys().next(), totals.keys().next_back()) else {
        return Vec::new();
    };

    let mut series = Vec::with_capacity(first.months_until(last) as usize + 1);
    let mut month = first;
    while month <= last {
        series.push((month, totals.get(&month).copied().unwrap_or(0.0)));
        month = month.succ();
    }
    series
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Fitted additive trend + yearly seasonality model.
#[derive(Debug, Clone, PartialEq)]
pub struct AdditiveModel {
    start: YearMonth,
    n_obs: usize,
    intercept: f64,
    slope: f64,
    /// Offset per calendar month (index 0 = January), summing to zero.
    seasonal: Option<[f64; 12]>,
    /// Residual standard deviation.
    sigma: f64,
}

impl AdditiveModel {
    /// Fit to a contiguous monthly series (see [`fill_months`]).
    pub fn fit(series: &[(YearMonth, f64)], config: &ForecastConfig) -> Result<Self> {
        if series.len() < 2 {
            return Err(DataError::InsufficientData {
                required: 2,
                actual: series.len(),
            });
        }
        let start = series[0].0;
        let n = series.len();

        let seasonal_fit = if config.yearly_seasonality && n >= SEASONAL_MIN_MONTHS {
            fit_with_season(start, series)
        } else {
            None
        };

        let (intercept, slope, seasonal) = match seasonal_fit {
            Some((intercept, slope, season)) => (intercept, slope, Some(season)),
            None => {
                let (intercept, slope) = fit_trend(start, series).ok_or_else(|| {
                    DataError::Malformed("monthly series has no spread in time".into())
                })?;
                (intercept, slope, None)
            }
        };

        let mut model = AdditiveModel {
            start,
            n_obs: n,
            intercept,
            slope,
            seasonal,
            sigma: 0.0,
        };

        let ss_res: f64 = series
            .iter()
            .map(|&(m, y)| (y - model.predict_at(m)).powi(2))
            .sum();
        let params = if model.seasonal.is_some() { 13 } else { 2 };
        let dof = n.saturating_sub(params).max(1);
        model.sigma = (ss_res / dof as f64).sqrt();

        log::debug!(
            "Fitted forecast model on {n} months: slope={:.2}, seasonal={}, sigma={:.2}",
            model.slope,
            model.seasonal.is_some(),
            model.sigma
        );
        Ok(model)
    }

    /// Point prediction for any month.
    pub fn predict_at(&self, month: YearMonth) -> f64 {
        let t = self.start.months_until(month) as f64;
        let season = self
            .seasonal
            .map(|s| s[(month.month - 1) as usize])
            .unwrap_or(0.0);
        self.intercept + self.slope * t + season
    }

    pub fn is_seasonal(&self) -> bool {
        self.seasonal.is_some()
    }

    /// Half-width of the interval `steps` months past the last observation.
    fn half_width(&self, z: f64, steps: usize) -> f64 {
        z * self.sigma * (1.0 + steps as f64 / self.n_obs as f64).sqrt()
    }
}

/// Ordinary least squares on the month index.
fn fit_trend(start: YearMonth, series: &[(YearMonth, f64)]) -> Option<(f64, f64)> {
    let n = series.len() as f64;
    let ts: Vec<f64> = series.iter().map(|&(m, _)| start.months_until(m) as f64).collect();
    let sum_t: f64 = ts.iter().sum();
    let sum_y: f64 = series.iter().map(|&(_, y)| y).sum();
    let sum_t2: f64 = ts.iter().map(|t| t * t).sum();
    let sum_ty: f64 = ts.iter().zip(series).map(|(t, &(_, y))| t * y).sum();

    let denominator = n * sum_t2 - sum_t * sum_t;
    if denominator.abs() < 1e-10 {
        return None;
    }
    let slope = (n * sum_ty - sum_t * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_t) / n;
    Some((intercept, slope))
}

/// Joint least squares on `[1, t, Feb..Dec dummies]`, then re-centre the
/// month effects so they sum to zero.
fn fit_with_season(start: YearMonth, series: &[(YearMonth, f64)]) -> Option<(f64, f64, [f64; 12])> {
    let rows: Vec<Vec<f64>> = series
        .iter()
        .map(|&(m, _)| {
            let mut row = vec![0.0; 13];
            row[0] = 1.0;
            row[1] = start.months_until(m) as f64;
            if m.month > 1 {
                row[m.month as usize] = 1.0;
            }
            row
        })
        .collect();
    let ys: Vec<f64> = series.iter().map(|&(_, y)| y).collect();
    let beta = least_squares(&rows, &ys)?;

    let mut effects = [0.0; 12];
    effects[1..].copy_from_slice(&beta[2..13]);
    let mean = effects.iter().sum::<f64>() / 12.0;
    let mut season = [0.0; 12];
    for (s, e) in season.iter_mut().zip(effects.iter()) {
        *s = e - mean;
    }
    Some((beta[0] + mean, beta[1], season))
}

/// Solve the normal equations `XᵀX β = Xᵀy` by Gaussian elimination with
/// partial pivoting. `None` if the system is singular.
fn least_squares(rows: &[Vec<f64>], ys: &[f64]) -> Option<Vec<f64>> {
    let p = rows.first()?.len();
    let mut a = vec![vec![0.0; p + 1]; p];
    for (row, &y) in rows.iter().zip(ys) {
        for i in 0..p {
            for j in 0..p {
                a[i][j] += row[i] * row[j];
            }
            a[i][p] += row[i] * y;
        }
    }

    for col in 0..p {
        let pivot = (col..p).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-9 {
            return None;
        }
        a.swap(col, pivot);
        for r in 0..p {
            if r == col {
                continue;
            }
            let factor = a[r][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..=p {
                let pivot_value = a[col][c];
                a[r][c] -= factor * pivot_value;
            }
        }
    }

    Some((0..p).map(|i| a[i][p] / a[i][i]).collect())
}

/// Two-sided normal quantile for the common interval widths.
fn z_score(interval_width: f64) -> f64 {
    match interval_width {
        x if x >= 0.99 => 2.576,
        x if x >= 0.95 => 1.96,
        x if x >= 0.90 => 1.645,
        x if x >= 0.80 => 1.282,
        x if x >= 0.50 => 0.674,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Forecast from observed monthly totals (gaps, repeats and any order allowed).
pub fn forecast_series(observed: &[(YearMonth, f64)], config: &ForecastConfig) -> Result<Forecast> {
    let distinct: BTreeSet<YearMonth> = observed.iter().map(|&(m, _)| m).collect();
    if distinct.len() < 2 {
        return Err(DataError::InsufficientData {
            required: 2,
            actual: distinct.len(),
        });
    }

    let series = fill_months(observed);
    let model = AdditiveModel::fit(&series, config)?;
    let z = z_score(config.interval_width);

    let mut points: Vec<ForecastPoint> = series
        .iter()
        .map(|&(month, actual)| {
            let predicted = model.predict_at(month);
            let half = model.half_width(z, 0);
            ForecastPoint {
                month,
                actual: Some(actual),
                predicted,
                lower: predicted - half,
                upper: predicted + half,
            }
        })
        .collect();

    let last_observed = series[series.len() - 1].0;
    let mut month = last_observed;
    for step in 1..=config.horizon {
        month = month.succ();
        let predicted = model.predict_at(month);
        let half = model.half_width(z, step);
        points.push(ForecastPoint {
            month,
            actual: None,
            predicted,
            lower: predicted - half,
            upper: predicted + half,
        });
    }

    Ok(Forecast {
        points,
        last_observed,
        interval_width: config.interval_width,
        seasonal: model.is_seasonal(),
    })
}

/// Forecast the monthly funding of a filtered view.
///
/// Fails with [`DataError::InsufficientData`] when fewer than two distinct
/// months are present.
pub fn forecast(view: &FilteredView<'_>, config: &ForecastConfig) -> Result<Forecast> {
    forecast_series(&monthly_totals(view), config)
}
