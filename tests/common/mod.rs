#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use loanflow::dialer::{BucketConfig, CollectionAccount, PhoneSlot, Skiptrace};
use loanflow::infra::{InMemoryApplicationRepository, RecordingActionDispatcher};
use loanflow::workflows::status::{
    Application, ApplicationRepository, ApplicationStatus, CreditScoreClass, ExperimentSetting,
    ScoreSnapshot, WorkflowEngine, WorkflowSettings, WorkflowType,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn application(id: i64, status: ApplicationStatus, referral: Option<&str>) -> Application {
    Application {
        id,
        workflow: WorkflowType::JuloOne,
        status,
        customer_id: 5001,
        account_id: Some(77),
        referral_code: referral.map(str::to_string),
        submitted_on: date(2026, 8, 1),
    }
}

pub fn score(class: CreditScoreClass, pgood: f64) -> ScoreSnapshot {
    ScoreSnapshot {
        score_class: class,
        pgood,
        fraud_device: false,
        bank_name_mismatch: false,
    }
}

pub fn permanent_medium_pass() -> ExperimentSetting {
    ExperimentSetting {
        code: "medium_score_pass".to_string(),
        is_active: true,
        is_permanent: true,
        start_date: date(2025, 1, 1),
        end_date: date(2025, 12, 31),
    }
}

pub struct EngineHarness {
    pub repository: Arc<InMemoryApplicationRepository>,
    pub dispatcher: Arc<RecordingActionDispatcher>,
    pub engine: WorkflowEngine<InMemoryApplicationRepository, RecordingActionDispatcher>,
}

pub fn engine_with(settings: WorkflowSettings) -> EngineHarness {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let dispatcher = Arc::new(RecordingActionDispatcher::default());
    let engine = WorkflowEngine::new(repository.clone(), dispatcher.clone(), settings);
    EngineHarness {
        repository,
        dispatcher,
        engine,
    }
}

pub fn seeded(
    settings: WorkflowSettings,
    application: Application,
    snapshot: Option<ScoreSnapshot>,
) -> EngineHarness {
    let harness = engine_with(settings);
    let id = application.id;
    harness
        .repository
        .insert(application)
        .expect("application seeds");
    if let Some(snapshot) = snapshot {
        harness.repository.set_score_snapshot(id, snapshot);
    }
    harness
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub fn bucket_b1() -> BucketConfig {
    BucketConfig {
        name: "B1".to_string(),
        dpd_min: 1,
        dpd_max: 11,
        min_outstanding: 100_000,
        risk_range: None,
        ineffective_threshold_days: 3,
        ineffective_refresh_days: 30,
        batch_size: 2,
    }
}

pub fn collection_account(account_id: i64, dpd: i64, outstanding: i64) -> CollectionAccount {
    let mut phones = BTreeMap::new();
    phones.insert(
        PhoneSlot::Mobile1,
        Skiptrace {
            id: account_id * 10 + 1,
            customer_id: account_id,
            phone_number: format!("+62811{account_id:04}1"),
        },
    );
    phones.insert(
        PhoneSlot::Kin,
        Skiptrace {
            id: account_id * 10 + 4,
            customer_id: account_id,
            phone_number: format!("+62811{account_id:04}4"),
        },
    );
    CollectionAccount {
        account_id,
        account_payment_id: account_id + 9000,
        customer_id: account_id,
        dpd,
        outstanding_amount: Some(outstanding),
        due_amount: Some(outstanding / 2),
        risk_score: Some(0.5),
        autodebet_active: false,
        phones,
    }
}
