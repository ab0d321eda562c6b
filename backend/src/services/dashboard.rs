//! Dashboard summary

use serde::Serialize;
use shared::nutrition::{evaluate_items, EvaluationRules, NutritionReport, PortionSize};
use shared::types::DashboardCounts;
use shared::{Akg, DailyMenu};
use sqlx::PgPool;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::services::akg::AkgService;
use crate::services::daily_menu::DailyMenuService;

const RECENT_LIMIT: i64 = 5;

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

#[derive(Debug, Serialize)]
pub struct RecentDailyMenu {
    #[serde(flatten)]
    pub daily_menu: DailyMenu,
    pub report: NutritionReport,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub counts: DashboardCounts,
    pub recent_daily_menus: Vec<RecentDailyMenu>,
    pub akg: Option<Akg>,
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn summary(&self, user: &AuthUser, rules: &EvaluationRules) -> AppResult<Dashboard> {
        let counts = self.counts(user).await?;
        let akg = AkgService::new(self.db.clone()).resolve(None).await?;
        let threshold = akg.as_ref().map(|a| &a.threshold);

        let recent_daily_menus = DailyMenuService::new(self.db.clone())
            .recent(user, RECENT_LIMIT)
            .await?
            .into_iter()
            .map(|daily_menu| {
                let report =
                    evaluate_items(&daily_menu.food_items(), PortionSize::Large, threshold, rules);
                RecentDailyMenu { daily_menu, report }
            })
            .collect();

        Ok(Dashboard {
            counts,
            recent_daily_menus,
            akg,
        })
    }

    async fn counts(&self, user: &AuthUser) -> AppResult<DashboardCounts> {
        let daily_menus = if user.is_admin() {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM daily_menus")
                .fetch_one(&self.db)
                .await?
        } else {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM daily_menus WHERE user_id = $1")
                .bind(user.user_id)
                .fetch_one(&self.db)
                .await?
        };

        let menus = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM menus")
            .fetch_one(&self.db)
            .await?;
        let food_types = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM food_types")
            .fetch_one(&self.db)
            .await?;

        let users = if user.is_admin() {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(&self.db)
                .await?
        } else {
            0
        };

        Ok(DashboardCounts {
            daily_menus,
            menus,
            food_types,
            users,
        })
    }
}
