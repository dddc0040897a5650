use crate::models::{ResolvedCode, TariffAnswer, TariffRequest};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tariff_cascade::{resolve_rate, PrimarySource, SecondarySource, TariffQuery};
use tariff_reference::{CodeResolver, CountryCatalog, ProductCatalog};
use tariff_system_store::SystemStore;
use tariff_vector_store::{AttributeFilter, Embedder};

/// Product code used when the catalog yields no match.
pub const FALLBACK_PRODUCT_CODE: &str = "000000";
/// Country code used when the catalog yields no match; doubles as the
/// world-aggregate partner.
pub const FALLBACK_COUNTRY_CODE: &str = "000";

/// The two resolver handles the orchestrator needs. Opening resolvers loads
/// index snapshots, so build this once per process and share it.
pub struct Resolvers {
    pub products: CodeResolver<ProductCatalog>,
    pub countries: CodeResolver<CountryCatalog>,
}

impl Resolvers {
    pub fn open(
        data_dir: impl AsRef<Path>,
        system_store: Arc<dyn SystemStore>,
        embedder: Arc<dyn Embedder>,
    ) -> tariff_reference::Result<Self> {
        let data_dir = data_dir.as_ref();
        Ok(Self {
            products: CodeResolver::new(
                ProductCatalog::new(),
                Arc::clone(&system_store),
                Arc::clone(&embedder),
                data_dir,
            )?,
            countries: CodeResolver::new(CountryCatalog::new(), system_store, embedder, data_dir)?,
        })
    }
}

/// Answer one tariff question end-to-end.
///
/// The three semantic resolutions have no data dependency on each other and
/// run concurrently; the cascade strictly waits for all of them.
pub async fn resolve_tariff(
    resolvers: &Resolvers,
    primary: &dyn PrimarySource,
    secondary: Option<&dyn SecondarySource>,
    request: &TariffRequest,
) -> Result<TariffAnswer> {
    let (product, reporter, partner) = tokio::try_join!(
        find_product_code(resolvers, &request.product),
        find_country_code(resolvers, &request.reporter, true),
        find_country_code(resolvers, &request.partner, false),
    )
    .context("code resolution failed")?;

    log::info!(
        "Resolved product '{}' -> {}, reporter '{}' -> {}, partner '{}' -> {}",
        request.product,
        product.code,
        request.reporter,
        reporter.code,
        request.partner,
        partner.code
    );

    let query = TariffQuery::new(
        reporter.code.clone(),
        partner.code.clone(),
        product.code.clone(),
        request.year,
    );
    let result = resolve_rate(&query, primary, secondary)
        .await
        .context("tariff cascade failed")?;

    Ok(TariffAnswer {
        product,
        reporter,
        partner,
        rate: result.rate,
        trace: result.trace,
    })
}

async fn find_product_code(
    resolvers: &Resolvers,
    description: &str,
) -> tariff_reference::Result<ResolvedCode> {
    let matches = resolvers.products.find(description, 1, None).await?;
    Ok(resolved_from(matches.into_iter().next(), "productcode", FALLBACK_PRODUCT_CODE))
}

async fn find_country_code(
    resolvers: &Resolvers,
    name: &str,
    is_reporter: bool,
) -> tariff_reference::Result<ResolvedCode> {
    let mut filter = AttributeFilter::new();
    filter.insert(
        "isreporter".to_string(),
        if is_reporter { "1" } else { "0" }.to_string(),
    );

    let matches = resolvers.countries.find(name, 1, Some(&filter)).await?;
    Ok(resolved_from(matches.into_iter().next(), "countrycode", FALLBACK_COUNTRY_CODE))
}

fn resolved_from(
    matched: Option<tariff_vector_store::CodeMatch>,
    code_attribute: &str,
    fallback: &str,
) -> ResolvedCode {
    match matched {
        Some(matched) => ResolvedCode {
            code: matched
                .attributes
                .get(code_attribute)
                .cloned()
                .unwrap_or_else(|| fallback.to_string()),
            reference: Some(matched),
        },
        None => ResolvedCode {
            code: fallback.to_string(),
            reference: None,
        },
    }
}
