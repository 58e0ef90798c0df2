//! Core document model for the resolution engine.
//!
//! Three record kinds participate in chain resolution: the base [`Contract`],
//! its [`Amendment`]s, and its [`Renewal`]s. Amendments and renewals carry a
//! sparse [`FieldOverlay`](crate::fields::FieldOverlay) of contract fields;
//! the resolver walks them backward in time to find the document that last
//! set a given field.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fields::FieldOverlay;

/// Identifier of a contract.
pub type ContractId = String;

/// Identifier of an amendment, renewal, or policy.
pub type DocumentId = String;

/// How the tenant pays: a fixed canon, a pure percentage of sales, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentModality {
    /// Fixed monthly canon only.
    Fixed,
    /// Percentage of reported sales only.
    Variable,
    /// Minimum guaranteed canon plus a percentage of sales.
    Hybrid,
}

/// Index driving periodic canon adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBasis {
    /// Consumer price index.
    ConsumerPriceIndex,
    /// Legal minimum wage.
    MinimumWage,
}

/// Periodicity of the index adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentPeriod {
    Annual,
    Semestral,
    Custom,
}

/// The five policy types a contract may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    /// Third-party civil liability (RCE).
    CivilLiability,
    /// Contractual compliance bond.
    Compliance,
    /// Lease guarantee.
    Lease,
    /// All-risk property cover.
    AllRisk,
    /// Free-form additional policy, named via its label field.
    Other,
}

impl PolicyType {
    /// All types, in requirement-map order.
    pub fn all() -> [PolicyType; 5] {
        [
            PolicyType::CivilLiability,
            PolicyType::Compliance,
            PolicyType::Lease,
            PolicyType::AllRisk,
            PolicyType::Other,
        ]
    }

    /// Display name used in conflict messages and audit output.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::CivilLiability => "civil-liability",
            PolicyType::Compliance => "compliance",
            PolicyType::Lease => "lease",
            PolicyType::AllRisk => "all-risk",
            PolicyType::Other => "other",
        }
    }
}

/// Named sub-coverage lines inside a policy requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubLimit {
    OwnerTenantOccupant,
    EmployerLiability,
    ThirdPartyMedical,
    Vehicles,
    Contractors,
    ConsequentialLoss,
    MoralDamages,
    LostProfits,
    Wages,
    Utilities,
    Vat,
    AdminFee,
}

/// Approval state of an amendment or renewal.
///
/// Only approved documents participate in chain resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Draft,
    InReview,
    Approved,
}

/// Inclusive validity window of a document.
///
/// `until = None` means open-ended: the document stays current until
/// superseded by a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub until: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(from: NaiveDate, until: Option<NaiveDate>) -> Self {
        Self { from, until }
    }

    pub fn open(from: NaiveDate) -> Self {
        Self { from, until: None }
    }

    /// True when `date` lies inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        if date < self.from {
            return false;
        }
        match self.until {
            Some(until) => date <= until,
            None => true,
        }
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.until {
            Some(until) => write!(f, "{} - {}", self.from, until),
            None => write!(f, "{} - open", self.from),
        }
    }
}

/// Baseline policy terms stored on the contract itself, per type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyTerms {
    /// Whether the contract requires this policy type at all.
    pub required: bool,
    pub insured_value: Option<Decimal>,
    pub coverage_months: Option<u32>,
    pub coverage_start: Option<NaiveDate>,
    pub coverage_end: Option<NaiveDate>,
    /// Display name, used for the free-form `Other` type.
    pub label: Option<String>,
    /// Sparse sub-coverage breakdown; absence means unset.
    pub sub_limits: BTreeMap<SubLimit, Decimal>,
}

/// An applied index adjustment (CPI or minimum-wage) recorded against a
/// contract. These sit outside the amendment chain: the effective view
/// layers the most recent applied event on top of the resolved canon unless
/// a later-approved document already superseded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexationEvent {
    pub id: DocumentId,
    /// Date from which the adjusted canon applies.
    pub applied_on: NaiveDate,
    /// When the adjustment was computed; breaks ties among same-day events.
    pub computed_at: DateTime<Utc>,
    pub basis: IndexBasis,
    /// Canon after the adjustment.
    pub new_canon: Decimal,
}

/// The baseline contract record.
///
/// Baseline fields are mutated only through direct edits to the contract
/// itself; amendments and renewals never write into them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// Human-facing contract number.
    pub number: String,
    pub start_date: NaiveDate,
    pub initial_term_months: u32,
    pub initial_end_date: Option<NaiveDate>,
    /// End date after direct contract edits; renewals also advance it.
    pub updated_end_date: Option<NaiveDate>,
    pub payment_modality: PaymentModality,
    /// Fixed monthly canon.
    pub canon: Option<Decimal>,
    pub min_guaranteed_canon: Option<Decimal>,
    /// Percentage of sales, for variable and hybrid modalities.
    pub sales_percent: Option<Decimal>,
    pub index_basis: Option<IndexBasis>,
    /// Points added on top of the index when adjusting.
    pub index_extra_points: Option<Decimal>,
    pub index_period: Option<AdjustmentPeriod>,
    /// Anchor date for the periodic adjustment.
    pub index_anchor: Option<NaiveDate>,
    pub auto_renew: bool,
    pub renewal_count: u32,
    pub last_renewed_on: Option<NaiveDate>,
    /// Baseline policy requirements, per type.
    pub policy_terms: BTreeMap<PolicyType, PolicyTerms>,
    /// Applied index adjustments, unordered.
    pub indexations: Vec<IndexationEvent>,
}

impl Contract {
    /// Baseline end date: the directly-edited value, else the initial one.
    pub fn baseline_end_date(&self) -> Option<NaiveDate> {
        self.updated_end_date.or(self.initial_end_date)
    }

    /// Baseline terms for a policy type; an absent entry means the type is
    /// not required by the base contract.
    pub fn policy_terms(&self, policy_type: PolicyType) -> Option<&PolicyTerms> {
        self.policy_terms.get(&policy_type)
    }

    /// Apply a planned renewal: only the end date and renewal counters
    /// change. Policy overlay fields stay on the renewal document so that
    /// past-dated views remain correct.
    pub fn apply_renewal(&mut self, renewal: &Renewal) {
        self.updated_end_date = Some(renewal.new_end_date);
        self.renewal_count += 1;
        self.last_renewed_on = Some(renewal.approved_on.unwrap_or(renewal.window.from));
    }
}

/// An approved change document with its own validity window and sparse
/// field overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amendment {
    pub id: DocumentId,
    pub contract_id: ContractId,
    /// Numeric suffix of the "OS-n" sequence.
    pub sequence: u32,
    pub window: DateWindow,
    pub state: ApprovalState,
    pub approved_at: Option<DateTime<Utc>>,
    /// Administrative correction counter; breaks ordering ties.
    pub version: u32,
    /// Gate for the policy overlay group: when false, the per-type policy
    /// overrides are ignored by the resolver.
    pub modifies_policies: bool,
    pub overlay: FieldOverlay,
}

impl Amendment {
    pub fn label(&self) -> String {
        format!("Amendment OS-{}", self.sequence)
    }

    /// True when a later amendment of the same contract exists, judged by
    /// the numeric suffix. A document with a successor must not be deleted.
    pub fn has_successor(&self, amendments: &[Amendment]) -> bool {
        amendments
            .iter()
            .any(|other| other.id != self.id && other.sequence > self.sequence)
    }
}

/// An automatic-extension document. Pushes the contract end date forward and
/// may carry its own policy overrides; it never mutates the base contract's
/// policy fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renewal {
    pub id: DocumentId,
    pub contract_id: ContractId,
    /// Numeric suffix of the "RA-n" sequence.
    pub sequence: u32,
    /// Opens the day after the prior end date.
    pub window: DateWindow,
    /// End date in force immediately before this renewal, recorded for audit.
    pub prior_end_date: NaiveDate,
    pub new_end_date: NaiveDate,
    pub months_applied: u32,
    /// Whether the initial contract term was used as the extension length.
    pub used_initial_term: bool,
    pub state: ApprovalState,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_on: Option<NaiveDate>,
    pub version: u32,
    pub modifies_policies: bool,
    pub overlay: FieldOverlay,
}

impl Renewal {
    pub fn label(&self) -> String {
        format!("Renewal RA-{}", self.sequence)
    }
}

/// Closed union over the two override-carrying document kinds.
///
/// Gives the resolver a uniform window/overlay/label surface so it can walk
/// one ordered list without type inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDocument {
    Amendment(Amendment),
    Renewal(Renewal),
}

impl EventDocument {
    pub fn id(&self) -> &DocumentId {
        match self {
            EventDocument::Amendment(a) => &a.id,
            EventDocument::Renewal(r) => &r.id,
        }
    }

    pub fn window(&self) -> DateWindow {
        match self {
            EventDocument::Amendment(a) => a.window,
            EventDocument::Renewal(r) => r.window,
        }
    }

    pub fn effective_from(&self) -> NaiveDate {
        self.window().from
    }

    pub fn effective_to(&self) -> Option<NaiveDate> {
        self.window().until
    }

    pub fn state(&self) -> ApprovalState {
        match self {
            EventDocument::Amendment(a) => a.state,
            EventDocument::Renewal(r) => r.state,
        }
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        match self {
            EventDocument::Amendment(a) => a.approved_at,
            EventDocument::Renewal(r) => r.approved_at,
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            EventDocument::Amendment(a) => a.version,
            EventDocument::Renewal(r) => r.version,
        }
    }

    pub fn modifies_policies(&self) -> bool {
        match self {
            EventDocument::Amendment(a) => a.modifies_policies,
            EventDocument::Renewal(r) => r.modifies_policies,
        }
    }

    pub fn overlay(&self) -> &FieldOverlay {
        match self {
            EventDocument::Amendment(a) => &a.overlay,
            EventDocument::Renewal(r) => &r.overlay,
        }
    }

    pub fn label(&self) -> String {
        match self {
            EventDocument::Amendment(a) => a.label(),
            EventDocument::Renewal(r) => r.label(),
        }
    }

    /// True when the document's validity window contains `date`.
    pub fn is_current_at(&self, date: NaiveDate) -> bool {
        self.window().contains(date)
    }
}

/// Which document a policy was uploaded against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum DocumentOrigin {
    Contract,
    Amendment { id: DocumentId },
    Renewal { id: DocumentId },
}

/// An uploaded insurance instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: DocumentId,
    pub contract_id: ContractId,
    pub policy_type: PolicyType,
    /// Insurer-assigned policy number.
    pub number: String,
    pub insured_value: Decimal,
    pub coverage_start: Option<NaiveDate>,
    /// Stated coverage end; the primary date in compliance checks.
    pub coverage_end: NaiveDate,
    /// Cushion: extra months bought beyond the contract-driven requirement.
    pub has_cushion: bool,
    pub cushion_months: Option<u32>,
    /// Separately stored real expiration, used only as the fallback branch
    /// of the compliance check.
    pub real_expiration: Option<NaiveDate>,
    /// The document whose requirement this policy is meant to satisfy.
    pub origin: DocumentOrigin,
    pub insurer: Option<String>,
    pub file_url: Option<String>,
}

/// Pointer to the document that resolved a field, for audit display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub label: String,
    pub version: u32,
}

impl DocumentRef {
    pub fn of(doc: &EventDocument) -> Self {
        Self {
            id: doc.id().clone(),
            label: doc.label(),
            version: doc.version(),
        }
    }
}
