use std::sync::Arc;

use anyhow::{Context, Result};
use folio_context::{
    CitySearchSource, ContextSources, GeoTimezoneSource, InitOptions, LanguageSource,
    SystemLanguageSource, SystemTimezoneSource, UserContextService, WeatherSource,
};
use folio_core::{AppError, Config, ConfigError, WeatherError};
use folio_weather::{IpLocator, NominatimClient, OpenMeteoClient};

fn build_service(config: &Config) -> Result<UserContextService> {
    let language = Arc::new(SystemLanguageSource::from_env());
    let locale = language
        .current_language()
        .map(|info| info.full_code)
        .unwrap_or_else(|_| "en-US".to_string());

    let nominatim = Arc::new(
        NominatimClient::new(&config.geocoding.nominatim_url, &config.geocoding.user_agent)
            .context("Failed to create geocoding client")?
            .with_search_limit(config.geocoding.search_limit),
    );
    let open_meteo = OpenMeteoClient::new(
        &config.endpoints.open_meteo_url,
        config.weather.temperature_unit,
    )
    .context("Failed to create Open-Meteo client")?;
    let locator =
        IpLocator::new(&config.endpoints.ip_api_url).context("Failed to create IP locator")?;

    let weather = config
        .weather
        .enabled
        .then(|| Arc::new(open_meteo.clone()) as Arc<dyn WeatherSource>);

    Ok(UserContextService::new(ContextSources {
        geolocation: Arc::new(locator),
        geocoding: nominatim.clone(),
        timezone: Arc::new(GeoTimezoneSource::new(
            SystemTimezoneSource::from_env(locale),
            Some(open_meteo),
        )),
        language,
        city_search: Some(nominatim as Arc<dyn CitySearchSource>),
        weather,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    folio_core::init()?;

    let (config, _warnings) = Config::load_validated().map_err(|e| {
        let err = AppError::from(ConfigError::from_load_error(&e));
        eprintln!("{}", err.user_message());
        err
    })?;

    let mut service = build_service(&config)?;
    service.subscribe(|event| {
        tracing::debug!("Context event: {}", serde_json::to_string(event)?);
        Ok(())
    });

    let mut state = service
        .initialize_from_browser(InitOptions::from(&config.context))
        .await
        .map_err(AppError::from)?;

    // An optional argument picks a city by name instead of the detected one
    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !query.trim().is_empty() {
        match service.search_cities(&query).await {
            Ok(results) => match results.into_iter().next() {
                Some(city) => {
                    service.set_city(city).await.map_err(AppError::from)?;
                    state = service.current_state();
                }
                None => println!("No city matches '{}'", query.trim()),
            },
            Err(e) => println!("{}", e.user_message()),
        }
    }

    println!("Folio - visitor context ({:?})", service.phase());
    println!("  Language: {}", state.language.full_code);
    match &state.city {
        Some(city) => println!("  City:     {}", city.formatted),
        None => println!("  City:     unknown"),
    }
    if let Some(timezone) = &state.timezone {
        println!("  Timezone: {} ({})", timezone.timezone, timezone.offset_string);
    }
    match &state.weather {
        Some(weather) => println!(
            "  Weather:  {:.1} {:?}, {}",
            weather.temperature,
            weather.unit,
            weather.condition.description()
        ),
        None => {
            let reason = if config.weather.enabled {
                WeatherError::Unavailable
            } else {
                WeatherError::Disabled
            };
            println!("  Weather:  {}", AppError::from(reason).user_message());
        }
    }

    tracing::debug!("Final state: {}", serde_json::to_string(&state)?);
    Ok(())
}
