use crate::error::{CascadeError, Result};
use crate::sources::{
    Indicator, IndicatorOutcome, IndicatorQuery, Observation, ObservationQuery, PrimarySource,
    SecondarySource,
};
use crate::types::{
    Dimension, FallbackTrace, TariffQuery, TariffResult, WORLD_PARTNER, ZERO_RATE_CAVEAT,
};

/// Run the full fallback cascade for one query.
///
/// Steps 1–5 are strictly sequential; the granularity/partner scan walks one
/// flat ordered combination list so the termination rules (first non-zero
/// wins, zero is a last resort) stay independently testable.
pub async fn resolve_rate(
    query: &TariffQuery,
    primary: &dyn PrimarySource,
    secondary: Option<&dyn SecondarySource>,
) -> Result<TariffResult> {
    let mut trace = FallbackTrace::default();

    // Step 1: availability discovery. A failure here is a precondition
    // failure, not a fallback.
    let availability = primary.availability(&query.reporter).await.map_err(|failure| {
        CascadeError::SourceUnavailable {
            url: failure.url,
            message: failure.message,
        }
    })?;

    // Step 2: year selection. Candidates are available years at or before
    // the target, most recent first; never look forward in time.
    let mut selected_year = availability
        .years_descending()
        .filter(|year| *year <= query.target_year)
        .find(|year| query.is_world_partner() || availability.has_partner(*year, &query.partner));

    if selected_year.is_none() && !query.is_world_partner() {
        trace.relax(Dimension::Partner, &query.partner, WORLD_PARTNER);
        selected_year = availability
            .years_descending()
            .find(|year| *year <= query.target_year);
    }

    let Some(year) = selected_year else {
        trace.note(format!(
            "no available year at or before {} for reporter {}",
            query.target_year, query.reporter
        ));
        return Ok(TariffResult { rate: None, trace });
    };
    if year != query.target_year {
        trace.relax(
            Dimension::Year,
            &query.target_year.to_string(),
            &year.to_string(),
        );
    }

    // Step 3: scan the ordered (partner, granularity) combinations. The
    // first non-zero rate stops the scan; the first zero is kept as a last
    // resort while the scan continues looking for something better.
    let ladder = query.granularity_ladder();
    let mut partners = vec![query.partner.clone()];
    if !query.is_world_partner() {
        partners.push(WORLD_PARTNER.to_string());
    }
    let combinations: Vec<(&str, &str)> = partners
        .iter()
        .flat_map(|partner| ladder.iter().map(move |code| (partner.as_str(), code.as_str())))
        .collect();

    let mut winner: Option<(f64, String, String, String)> = None;
    let mut first_zero: Option<(String, String, String)> = None;
    let mut last_url: Option<String> = None;

    for (partner, code) in combinations {
        let observation = primary
            .observation(&ObservationQuery {
                reporter: &query.reporter,
                partner,
                product: code,
                year,
            })
            .await;

        match observation {
            Observation::Value { rate, url } => {
                last_url = Some(url.clone());
                if rate != 0.0 {
                    winner = Some((rate, partner.to_string(), code.to_string(), url));
                    break;
                }
                trace.note(format!(
                    "zero rate observed for product {code}, partner {partner} at {url}"
                ));
                if first_zero.is_none() {
                    first_zero = Some((partner.to_string(), code.to_string(), url));
                }
            }
            Observation::NoData { url } => {
                last_url = Some(url);
            }
            Observation::Failed { url, message } => {
                // Timeouts and transport failures only fail this combination.
                log::debug!("Combination failed at {url}: {message}");
                last_url = Some(url);
            }
            Observation::Invalid { url, raw } => {
                return Err(CascadeError::InvalidObservation { url, value: raw });
            }
        }
    }

    let (primary_rate, used_partner, used_code) = match (winner, first_zero) {
        (Some((rate, partner, code, url)), _) => {
            trace.last_url = Some(url);
            (rate, partner, code)
        }
        (None, Some((partner, code, url))) => {
            trace.last_url = Some(url);
            (0.0, partner, code)
        }
        (None, None) => {
            trace.last_url = last_url;
            trace.note("no tariff data found after exhausting year, partner, and granularity fallbacks");
            return Ok(TariffResult { rate: None, trace });
        }
    };

    if used_code != query.product_code {
        trace.relax(Dimension::Product, &query.product_code, &used_code);
    }
    if used_partner != query.partner && !trace.has_relaxed(Dimension::Partner) {
        trace.relax(Dimension::Partner, &query.partner, &used_partner);
    }

    // Step 4: secondary cross-reference, soft-failing throughout.
    let mut secondary_rate = None;
    if primary_rate == 0.0 || !query.is_world_partner() {
        match secondary {
            Some(source) => {
                secondary_rate = cross_reference(query, source, primary_rate, &mut trace).await;
            }
            None => log::debug!("No secondary source configured; skipping cross-reference"),
        }
    }

    // Step 5: final rate selection.
    if primary_rate == 0.0 {
        trace.note(ZERO_RATE_CAVEAT);
    }
    let final_rate = match secondary_rate {
        Some(rate) if rate != 0.0 && rate != primary_rate => {
            trace.note(format!(
                "using secondary rate {rate} over primary {primary_rate}"
            ));
            rate
        }
        _ => primary_rate,
    };

    Ok(TariffResult {
        rate: Some(final_rate),
        trace,
    })
}

async fn cross_reference(
    query: &TariffQuery,
    source: &dyn SecondarySource,
    primary_rate: f64,
    trace: &mut FallbackTrace,
) -> Option<f64> {
    let indicators = match source.indicators().await {
        Ok(indicators) => indicators,
        Err(failure) => {
            trace.note(format!(
                "cross-reference aborted: indicator catalog unavailable at {} ({})",
                failure.url, failure.message
            ));
            return None;
        }
    };

    let Some(indicator) = select_indicator(&indicators) else {
        trace.note("cross-reference aborted: no tariff indicator available");
        return None;
    };
    log::debug!(
        "Cross-referencing with indicator {} ({})",
        indicator.code,
        indicator.name
    );

    // The secondary source rejects dimension parameters an indicator does
    // not support, so only the dimensions its name hints at are sent.
    let hints = DimensionHints::from_name(&indicator.name);
    let mut outcome = source
        .data(&IndicatorQuery {
            indicator: indicator.code.clone(),
            reporter: query.reporter.clone(),
            partner: hints.partner.then(|| query.partner.clone()),
            product: hints.product.then(|| query.product_code.clone()),
        })
        .await;

    if let IndicatorOutcome::DimensionRejected { url, .. } = &outcome {
        trace.note(format!(
            "indicator {} rejected dimension parameters at {url}; retrying with reporter only",
            indicator.code
        ));
        outcome = source
            .data(&IndicatorQuery {
                indicator: indicator.code.clone(),
                reporter: query.reporter.clone(),
                partner: None,
                product: None,
            })
            .await;
    }

    match outcome {
        IndicatorOutcome::Value { rate, url } => {
            if rate == primary_rate {
                trace.note(format!("confirmed: secondary source reports {rate} at {url}"));
            } else {
                trace.note(format!(
                    "discrepancy: secondary source reports {rate} (primary {primary_rate}) at {url}"
                ));
            }
            Some(rate)
        }
        IndicatorOutcome::NoData { url } => {
            trace.note(format!("secondary source returned no data at {url}"));
            None
        }
        IndicatorOutcome::DimensionRejected { url, message } => {
            trace.note(format!(
                "secondary source rejected the simplified query at {url}: {message}"
            ));
            None
        }
        IndicatorOutcome::Failed { url, message } => {
            trace.note(format!("secondary source query failed at {url}: {message}"));
            None
        }
    }
}

/// Pick the cross-reference indicator: a name containing both "MFN" and
/// "average" wins outright; otherwise the first tariff-ish name stands.
fn select_indicator(indicators: &[Indicator]) -> Option<&Indicator> {
    let mut fallback = None;
    for indicator in indicators {
        let name = indicator.name.to_lowercase();
        if name.contains("tariff") || name.contains("duty") || name.contains("tax") {
            if name.contains("mfn") && name.contains("average") {
                return Some(indicator);
            }
            if fallback.is_none() {
                fallback = Some(indicator);
            }
        }
    }
    fallback
}

/// Which query dimensions an indicator's name suggests it supports.
struct DimensionHints {
    partner: bool,
    product: bool,
}

impl DimensionHints {
    fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        Self {
            partner: name.contains("bilateral") || name.contains("partner"),
            product: ["product", "sector", "hs", "harmonized"]
                .iter()
                .any(|keyword| name.contains(keyword)),
        }
    }
}
