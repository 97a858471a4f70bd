//! OpenAPI documentation configuration.
//!
//! Served as JSON and through the Swagger UI.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::analytics::indicators::{BollingerBands, Macd, Stochastic};
use crate::analytics::screening::{
    MarketBreadth, RotationSignals, SectorPerformance, SectorRotation, StrategyDefinition,
};
use crate::analytics::{Criteria, IndicatorValues, PortfolioMetrics, RiskFigures, ScreeningStrategy};
use crate::api::handlers::{
    auth_handler, portfolio_handler, price_handler, screener_handler, signal_handler,
};
use crate::domain::{
    AssetType, IndicatorVote, MarketState, MarketStatus, Period, Portfolio, Position, PriceBar,
    PriceQuote, RiskLevel, SignalDecision, SignalRecord, TrendDirection, UserResponse, UserRole,
};
use crate::services::market_service::{MarketMover, MarketSummary, SearchResult, SymbolValidation};
use crate::services::portfolio_service::{
    AllocationBreakdown, AllocationEntry, Performance, PortfolioAnalytics, PortfolioDetail,
    PortfolioSummary, PositionView, UserMetrics,
};
use crate::services::screener_service::{
    BreadthReport, PerformanceSummary, ScreenedAsset, ScreeningRequest, ScreeningResult,
    SectorAnalysis, StrategyInfo,
};
use crate::services::signal_service::{
    IndicatorReport, MarketOverview, OverviewEntry, SignalBundle, SignalsSummary, StrengthLevel,
    StrongSignal,
};
use crate::services::TokenResponse;
use crate::types::{MessageResponse, PaginationMeta};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "InsightFinance API",
        version = "1.0.0",
        description = "Market data, technical signals, portfolio analytics and asset screening"
    ),
    paths(
        auth_handler::register,
        auth_handler::login,
        auth_handler::token,
        auth_handler::refresh,
        auth_handler::me,
        auth_handler::logout,
        price_handler::get_price,
        price_handler::batch_prices,
        price_handler::search,
        price_handler::market_summary,
        price_handler::market_status,
        price_handler::validate_symbol,
        signal_handler::get_signal,
        signal_handler::batch_signals,
        signal_handler::market_overview,
        signal_handler::signal_history,
        signal_handler::get_indicators,
        signal_handler::get_strength_levels,
        portfolio_handler::list_portfolios,
        portfolio_handler::create_portfolio,
        portfolio_handler::get_portfolio,
        portfolio_handler::update_portfolio,
        portfolio_handler::delete_portfolio,
        portfolio_handler::add_position,
        portfolio_handler::update_position,
        portfolio_handler::delete_position,
        portfolio_handler::portfolio_analytics,
        portfolio_handler::user_metrics,
        screener_handler::screen,
        screener_handler::strategies,
        screener_handler::sectors,
        screener_handler::market_breadth,
    ),
    components(
        schemas(
            // Auth
            UserRole,
            UserResponse,
            TokenResponse,
            MessageResponse,
            auth_handler::RegisterRequest,
            auth_handler::LoginRequest,
            auth_handler::TokenForm,
            auth_handler::RefreshRequest,
            // Prices
            AssetType,
            Period,
            PriceQuote,
            PriceBar,
            MarketState,
            MarketStatus,
            MarketMover,
            MarketSummary,
            SearchResult,
            SymbolValidation,
            price_handler::BatchPriceRequest,
            price_handler::PriceResponse,
            price_handler::BatchPriceResponse,
            // Signals
            SignalDecision,
            TrendDirection,
            RiskLevel,
            IndicatorVote,
            IndicatorValues,
            Macd,
            BollingerBands,
            Stochastic,
            SignalBundle,
            IndicatorReport,
            SignalsSummary,
            StrongSignal,
            OverviewEntry,
            MarketOverview,
            StrengthLevel,
            SignalRecord,
            PaginationMeta,
            signal_handler::BatchSignalRequest,
            signal_handler::BatchSignalResponse,
            signal_handler::SignalHistoryResponse,
            // Portfolio
            Portfolio,
            Position,
            PositionView,
            PortfolioSummary,
            AllocationEntry,
            PortfolioMetrics,
            RiskFigures,
            PortfolioDetail,
            Performance,
            AllocationBreakdown,
            PortfolioAnalytics,
            UserMetrics,
            portfolio_handler::CreatePortfolioRequest,
            portfolio_handler::UpdatePortfolioRequest,
            portfolio_handler::AddPositionRequest,
            portfolio_handler::UpdatePositionRequest,
            // Screener
            ScreeningStrategy,
            Criteria,
            StrategyDefinition,
            StrategyInfo,
            ScreeningRequest,
            ScreenedAsset,
            PerformanceSummary,
            ScreeningResult,
            SectorPerformance,
            RotationSignals,
            SectorRotation,
            SectorAnalysis,
            MarketBreadth,
            BreadthReport,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and tokens"),
        (name = "Prices", description = "Quotes, history and market status"),
        (name = "Signals", description = "Technical indicators and trading signals"),
        (name = "Portfolio", description = "Portfolios, positions and analytics"),
        (name = "Screener", description = "Strategy screening, sectors and breadth")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /auth/login"))
                        .build(),
                ),
            );
        }
    }
}
