//! Clinical reviews and review-form validation.
//!
//! A reviewer submits a [`ReviewSubmission`]; validation applies the form's
//! branching rules, clears fields that do not apply to the chosen MCI
//! branch, and produces an immutable [`ClinicalJudgment`].

use super::{EventId, ReviewId, ReviewerSlot, UserId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

labelled_enum! {
    /// Myocardial infarction determination.
    pub enum Mci ("mci") {
        /// Definite MI.
        Definite => "Definite",
        /// Probable MI.
        Probable => "Probable",
        /// Not an MI.
        No => "No",
        /// Not an MI; resuscitated cardiac arrest.
        ResuscitatedCardiacArrest => "No [resuscitated cardiac arrest]",
    }
}

impl Mci {
    /// Returns `true` for the two negative determinations.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::No | Self::ResuscitatedCardiacArrest)
    }
}

labelled_enum! {
    /// Primary or secondary event.
    pub enum EventType ("type") {
        /// Primary MI.
        Primary => "Primary",
        /// MI secondary to another cause.
        Secondary => "Secondary",
    }
}

labelled_enum! {
    /// Cause of a secondary MI.
    pub enum SecondaryCause ("secondary_cause") {
        /// Anaphylaxis.
        Anaphylaxis => "Anaphlaxis",
        /// Arrhythmia.
        Arrhythmia => "Arrhythmia",
        /// Drug-induced vasospasm.
        Cocaine => "Cocaine or other illicit drug induced vasospasm",
        /// COVID.
        Covid => "COVID",
        /// Gastrointestinal bleed.
        GiBleed => "GI Bleed",
        /// Motor vehicle accident.
        Mva => "MVA",
        /// Overdose.
        Overdose => "Overdose",
        /// Procedure related.
        ProcedureRelated => "Procedure related",
        /// Sepsis or bacteremia.
        Sepsis => "Sepsis/bacteremia",
        /// Hypertensive urgency or emergency.
        HypertensiveUrgency => "Hypertensive urgency/emergency",
        /// Hypoxia.
        Hypoxia => "Hypoxia",
        /// Hypotension.
        Hypotension => "Hypotension",
        /// Free-text cause in `other_cause`.
        Other => "Other",
    }
}

labelled_enum! {
    /// Cardiac enzyme criteria applied.
    pub enum CeCriteria ("ce_criteria") {
        /// Standard criteria.
        Standard => "Standard criteria",
        /// PTCA criteria.
        Ptca => "PTCA criteria",
        /// CABG criteria.
        Cabg => "CABG criteria",
        /// Muscle trauma.
        MuscleTrauma => "Muscle trauma other than PTCA/CABG",
    }
}

labelled_enum! {
    /// Reason a positive finding is considered false.
    pub enum FalsePositiveReason ("false_positive_reason") {
        /// Congestive heart failure.
        CongestiveHeartFailure => "Congestive heart failure",
        /// Myocarditis.
        Myocarditis => "Myocarditis",
        /// Pericarditis.
        Pericarditis => "Pericarditis",
        /// Pulmonary embolism.
        PulmonaryEmbolism => "Pulmonary embolism",
        /// Renal failure.
        RenalFailure => "Renal failure",
        /// Severe sepsis or shock.
        SevereSepsis => "Severe sepsis/shock",
        /// Free-text reason in `false_positive_other_cause`.
        Other => "Other",
    }
}

labelled_enum! {
    /// Cardiac intervention type.
    pub enum CiType ("ci_type") {
        /// Bypass surgery.
        CabgSurgery => "CABG/Surgery",
        /// Angioplasty.
        Pci => "PCI/Angioplasty",
        /// Stent.
        Stent => "Stent",
        /// Not known.
        Unknown => "Unknown",
    }
}

labelled_enum! {
    /// ECG-based classification.
    pub enum EcgType ("ecg_type") {
        /// ST-elevation MI.
        Stemi => "STEMI",
        /// Non-ST-elevation MI.
        NonStemi => "non-STEMI",
        /// Other or uninterpretable tracing.
        OtherUninterpretable => "Other/Uninterpretable",
        /// New left bundle branch block.
        NewLbbb => "New LBBB",
        /// Normal tracing.
        Normal => "Normal",
        /// No EKG available.
        NoEkg => "No EKG",
    }
}

/// Removes markup tags from free text.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => output.push(ch),
            _ => {}
        }
    }
    output
}

/// Strips markup and maps blank text to `None`.
pub(crate) fn clean_text(text: Option<String>) -> Option<String> {
    text.map(|value| strip_markup(&value).trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Raw review form as submitted by a reviewer.
///
/// Tri-state answers (`Option<bool>`) distinguish "not answered" from "no".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSubmission {
    /// MI determination.
    pub mci: Option<Mci>,
    /// Abnormal cardiac enzyme values present.
    pub abnormal_ce_values_flag: bool,
    /// Enzyme criteria applied.
    pub ce_criteria: Option<CeCriteria>,
    /// Chest pain present.
    pub chest_pain_flag: bool,
    /// ECG changes present.
    pub ecg_changes_flag: bool,
    /// LV motion abnormality by imaging.
    pub lvm_by_imaging_flag: bool,
    /// Cardiac intervention performed.
    pub ci: Option<bool>,
    /// Cardiac intervention type.
    pub ci_type: Option<CiType>,
    /// Primary or secondary.
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    /// Cause of a secondary event.
    pub secondary_cause: Option<SecondaryCause>,
    /// Free-text secondary cause.
    pub other_cause: Option<String>,
    /// False positive finding.
    pub false_positive_flag: bool,
    /// False positive reason.
    pub false_positive_reason: Option<FalsePositiveReason>,
    /// Free-text false positive reason.
    pub false_positive_other_cause: Option<String>,
    /// Current tobacco use.
    pub current_tobacco_use_flag: Option<bool>,
    /// Past tobacco use.
    pub past_tobacco_use_flag: Option<bool>,
    /// Cocaine use.
    pub cocaine_use_flag: Option<bool>,
    /// Family history of heart disease.
    pub family_history_flag: Option<bool>,
    /// Cardiac catheterisation performed.
    pub cardiac_cath: Option<bool>,
    /// ECG-based classification.
    pub ecg_type: Option<EcgType>,
}

impl ReviewSubmission {
    /// Validates the form and produces the judgment to store.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] the form's rules detect.
    pub fn validate(self) -> Result<ClinicalJudgment, ValidationError> {
        let mci = self.mci.ok_or(ValidationError::MciBlank)?;
        let cardiac_cath = self.cardiac_cath;

        let judgment = if mci.is_negative() {
            Self::negative_judgment(mci, self.ci, self.ci_type)?
        } else {
            self.positive_judgment(mci)?
        };

        Ok(ClinicalJudgment {
            cardiac_cath: cardiac_cath.ok_or(ValidationError::CardiacCathBlank)?,
            ..judgment
        })
    }

    fn negative_judgment(
        mci: Mci,
        ci: Option<bool>,
        ci_type: Option<CiType>,
    ) -> Result<ClinicalJudgment, ValidationError> {
        let intervention = ci.ok_or(ValidationError::CiBlank)?;
        let resolved_type = if intervention {
            Some(ci_type.ok_or(ValidationError::CiTypeBlank)?)
        } else {
            None
        };
        Ok(ClinicalJudgment {
            ci: Some(intervention),
            ci_type: resolved_type,
            ..ClinicalJudgment::empty(mci)
        })
    }

    fn positive_judgment(self, mci: Mci) -> Result<ClinicalJudgment, ValidationError> {
        let ce_criteria = if self.abnormal_ce_values_flag {
            Some(self.ce_criteria.ok_or(ValidationError::NoCeCriteria)?)
        } else {
            None
        };

        if !self.abnormal_ce_values_flag
            && !self.chest_pain_flag
            && !self.ecg_changes_flag
            && !self.lvm_by_imaging_flag
        {
            return Err(ValidationError::NoCriteria);
        }

        let event_type = self.event_type.ok_or(ValidationError::TypeBlank)?;
        let (secondary_cause, other_cause) = match event_type {
            EventType::Primary => (None, None),
            EventType::Secondary => {
                let cause = self
                    .secondary_cause
                    .ok_or(ValidationError::SecondaryCauseBlank)?;
                if cause == SecondaryCause::Other {
                    let text =
                        clean_text(self.other_cause).ok_or(ValidationError::OtherCauseBlank)?;
                    (Some(cause), Some(text))
                } else {
                    (Some(cause), None)
                }
            }
        };

        let ecg_type = self.ecg_type.ok_or(ValidationError::EcgTypeBlank)?;

        let (false_positive_reason, false_positive_other_cause) = if self.false_positive_flag {
            let reason = self
                .false_positive_reason
                .ok_or(ValidationError::FalsePositiveReasonBlank)?;
            if reason == FalsePositiveReason::Other {
                let text = clean_text(self.false_positive_other_cause)
                    .ok_or(ValidationError::FalsePositiveOtherCauseBlank)?;
                (Some(reason), Some(text))
            } else {
                (Some(reason), None)
            }
        } else {
            (None, None)
        };

        let current_tobacco = self
            .current_tobacco_use_flag
            .ok_or(ValidationError::CurrentTobaccoUseBlank)?;
        let past_tobacco = if current_tobacco {
            None
        } else {
            Some(
                self.past_tobacco_use_flag
                    .ok_or(ValidationError::PastTobaccoUseBlank)?,
            )
        };
        let cocaine = self
            .cocaine_use_flag
            .ok_or(ValidationError::CocaineUseBlank)?;
        let family_history = self
            .family_history_flag
            .ok_or(ValidationError::FamilyHistoryBlank)?;

        Ok(ClinicalJudgment {
            abnormal_ce_values_flag: Some(self.abnormal_ce_values_flag),
            ce_criteria,
            chest_pain_flag: Some(self.chest_pain_flag),
            ecg_changes_flag: Some(self.ecg_changes_flag),
            lvm_by_imaging_flag: Some(self.lvm_by_imaging_flag),
            event_type: Some(event_type),
            secondary_cause,
            other_cause,
            false_positive_flag: Some(self.false_positive_flag),
            false_positive_reason,
            false_positive_other_cause,
            current_tobacco_use_flag: Some(current_tobacco),
            past_tobacco_use_flag: past_tobacco,
            cocaine_use_flag: Some(cocaine),
            family_history_flag: Some(family_history),
            ecg_type: Some(ecg_type),
            ..ClinicalJudgment::empty(mci)
        })
    }
}

/// A validated clinical judgment.
///
/// Fields that do not apply to the chosen MCI branch are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalJudgment {
    /// MI determination.
    pub mci: Mci,
    /// Abnormal cardiac enzyme values present.
    pub abnormal_ce_values_flag: Option<bool>,
    /// Enzyme criteria applied.
    pub ce_criteria: Option<CeCriteria>,
    /// Chest pain present.
    pub chest_pain_flag: Option<bool>,
    /// ECG changes present.
    pub ecg_changes_flag: Option<bool>,
    /// LV motion abnormality by imaging.
    pub lvm_by_imaging_flag: Option<bool>,
    /// Cardiac intervention performed.
    pub ci: Option<bool>,
    /// Cardiac intervention type.
    pub ci_type: Option<CiType>,
    /// Primary or secondary.
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    /// Cause of a secondary event.
    pub secondary_cause: Option<SecondaryCause>,
    /// Free-text secondary cause.
    pub other_cause: Option<String>,
    /// False positive finding.
    pub false_positive_flag: Option<bool>,
    /// False positive reason.
    pub false_positive_reason: Option<FalsePositiveReason>,
    /// Free-text false positive reason.
    pub false_positive_other_cause: Option<String>,
    /// Current tobacco use.
    pub current_tobacco_use_flag: Option<bool>,
    /// Past tobacco use.
    pub past_tobacco_use_flag: Option<bool>,
    /// Cocaine use.
    pub cocaine_use_flag: Option<bool>,
    /// Family history of heart disease.
    pub family_history_flag: Option<bool>,
    /// Cardiac catheterisation performed.
    pub cardiac_cath: bool,
    /// ECG-based classification.
    pub ecg_type: Option<EcgType>,
}

impl ClinicalJudgment {
    const fn empty(mci: Mci) -> Self {
        Self {
            mci,
            abnormal_ce_values_flag: None,
            ce_criteria: None,
            chest_pain_flag: None,
            ecg_changes_flag: None,
            lvm_by_imaging_flag: None,
            ci: None,
            ci_type: None,
            event_type: None,
            secondary_cause: None,
            other_cause: None,
            false_positive_flag: None,
            false_positive_reason: None,
            false_positive_other_cause: None,
            current_tobacco_use_flag: None,
            past_tobacco_use_flag: None,
            cocaine_use_flag: None,
            family_history_flag: None,
            cardiac_cath: false,
            ecg_type: None,
        }
    }

    /// Returns the fields first-round reviewers must agree on.
    #[must_use]
    pub const fn adjudication_key(&self) -> AdjudicationKey {
        AdjudicationKey {
            mci: self.mci,
            ci: self.ci,
            event_type: self.event_type,
            false_positive_flag: self.false_positive_flag,
            false_positive_reason: self.false_positive_reason,
        }
    }
}

/// The five fields compared to decide first-round agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdjudicationKey {
    /// MI determination.
    pub mci: Mci,
    /// Cardiac intervention.
    pub ci: Option<bool>,
    /// Primary or secondary.
    pub event_type: Option<EventType>,
    /// False positive finding.
    pub false_positive_flag: Option<bool>,
    /// False positive reason.
    pub false_positive_reason: Option<FalsePositiveReason>,
}

/// A stored review. Immutable once saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    id: ReviewId,
    event_id: EventId,
    reviewer_id: UserId,
    slot: ReviewerSlot,
    judgment: ClinicalJudgment,
    submitted_at: DateTime<Utc>,
}

impl Review {
    /// Records a validated judgment from `reviewer_id` in `slot`.
    #[must_use]
    pub fn new(
        event_id: EventId,
        reviewer_id: UserId,
        slot: ReviewerSlot,
        judgment: ClinicalJudgment,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewId::new(),
            event_id,
            reviewer_id,
            slot,
            judgment,
            submitted_at,
        }
    }

    /// Returns the review identifier.
    #[must_use]
    pub const fn id(&self) -> ReviewId {
        self.id
    }

    /// Returns the reviewed event.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Returns the reviewer.
    #[must_use]
    pub const fn reviewer_id(&self) -> UserId {
        self.reviewer_id
    }

    /// Returns the reviewer slot.
    #[must_use]
    pub const fn slot(&self) -> ReviewerSlot {
        self.slot
    }

    /// Returns the clinical judgment.
    #[must_use]
    pub const fn judgment(&self) -> &ClinicalJudgment {
        &self.judgment
    }

    /// Returns the submission timestamp.
    #[must_use]
    pub const fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}
