use chrono::Utc;

use super::TravelerService;
use crate::error::Result;
use crate::reports::{
    self, CoatingStatusReport, DashboardStats, DateRange, LaborEfficiencyReport,
    TravelerCompletionReport,
};

impl TravelerService {
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let travelers = self.store.list().await?;
        let users = self.store.users().await?;
        Ok(reports::dashboard_stats(&travelers, users.len(), Utc::now().date_naive()))
    }

    pub async fn traveler_completion(&self, range: DateRange) -> Result<TravelerCompletionReport> {
        let travelers = self.store.list().await?;
        Ok(reports::traveler_completion(&travelers, range))
    }

    pub async fn labor_efficiency(&self, range: DateRange) -> Result<LaborEfficiencyReport> {
        let travelers = self.store.list().await?;
        let users = self.store.users().await?;
        Ok(reports::labor_efficiency(&travelers, &users, range))
    }

    pub async fn coating_status(&self) -> Result<CoatingStatusReport> {
        let travelers = self.store.list().await?;
        Ok(reports::coating_status(&travelers))
    }
}
