use super::ensure;
use crate::author::Author;
use crate::error::{HisError, HisResult};
use crate::models::accounts::Account;
use crate::models::tasks::{Act, Case, Order, Report, ReportDraft, ReportKind};
use crate::permissions::{has_model_perm, has_report_perm, EntityKind, PermAction};
use crate::store::Store;
use crate::versioned_files::{HisCommitAction, HisCommitDomain};
use his_uuid::ShardableUuid;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ReportService {
    store: Arc<Store>,
}

impl ReportService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Files a report written by `actor`.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` if the referenced order belongs to another case or the
    /// imaging study was acquired for another patient, and whatever [`Report::new`] rejects.
    pub fn create_report(&self, actor: &Account, draft: ReportDraft) -> HisResult<Report> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let case = tx.load::<Case>(&draft.case_id)?;
            if let Some(order_id) = &draft.order_id {
                let order = tx.load::<Order>(order_id)?;
                let act = tx.load::<Act>(&order.act_id)?;
                if act.case_id != case.id {
                    return Err(HisError::InvalidInput(format!(
                        "order {order_id} belongs to another case"
                    )));
                }
            }
            if let Some(study) = &draft.imaging {
                if study.patient_id != case.patient_id {
                    return Err(HisError::InvalidInput(format!(
                        "{} images belong to another patient",
                        study.modality.code()
                    )));
                }
            }

            let report = Report::new(draft, actor.id.clone())?;
            ensure(
                has_report_perm(actor, PermAction::Add, &report, &case),
                actor,
                "write reports on this case",
            )?;

            tx.save(
                &author,
                HisCommitDomain::Report,
                HisCommitAction::Create,
                &format!("Filed {} report", report.kind.code()),
                &report,
            )?;
            Ok(report)
        })
    }

    /// Reports the actor may read, optionally of one kind only, oldest first.
    pub fn list_reports(
        &self,
        actor: &Account,
        kind: Option<ReportKind>,
    ) -> HisResult<Vec<Report>> {
        ensure(
            has_model_perm(actor, PermAction::View, EntityKind::Report),
            actor,
            "view reports",
        )?;
        let cases: HashMap<ShardableUuid, Case> = self
            .store
            .list::<Case>()
            .into_iter()
            .map(|case| (case.id.clone(), case))
            .collect();

        let mut reports: Vec<Report> = self
            .store
            .list::<Report>()
            .into_iter()
            .filter(|report| kind.map_or(true, |k| report.kind == k))
            .filter(|report| {
                cases
                    .get(&report.case_id)
                    .is_some_and(|case| has_report_perm(actor, PermAction::View, report, case))
            })
            .collect();
        reports.sort_by_key(|report| report.stamps.created_at);
        Ok(reports)
    }

    pub fn show_report(&self, actor: &Account, report_id: &ShardableUuid) -> HisResult<Report> {
        let report = self.store.load::<Report>(report_id)?;
        let case = self.store.load::<Case>(&report.case_id)?;
        ensure(
            has_report_perm(actor, PermAction::View, &report, &case),
            actor,
            "view this report",
        )?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::objects::Patient;
    use crate::models::staging::{ImagingStudy, Modality, TnmStaging};
    use chrono::NaiveDate;
    use his_types::NonEmptyText;
    use crate::testing::TestHospital;

    fn case_of(hospital: &TestHospital, last_name: &str) -> Case {
        let patient = hospital
            .store
            .list::<Patient>()
            .into_iter()
            .find(|p| p.person.last_name.as_str() == last_name)
            .unwrap();
        hospital
            .store
            .list::<Case>()
            .into_iter()
            .find(|c| c.patient_id == patient.id)
            .unwrap()
    }

    fn draft(case: &Case, kind: ReportKind) -> ReportDraft {
        ReportDraft {
            case_id: case.id.clone(),
            order_id: None,
            kind,
            text: "Raumforderung im rechten Oberlappen.".into(),
            staging: None,
            resection: None,
            imaging: None,
        }
    }

    #[test]
    fn doctors_file_findings_with_staging() {
        let hospital = TestHospital::new();
        let reports = &hospital.services.reports;
        let fleming = hospital.login("fleming");
        let case = case_of(&hospital, "van Gogh");

        let mut findings = draft(&case, ReportKind::Findings);
        findings.staging = Some(TnmStaging::parse("T2N1M0").unwrap());
        let report = reports.create_report(&fleming, findings).unwrap();
        assert_eq!(report.written_by, fleming.id);
        assert_eq!(
            reports.show_report(&fleming, &report.id).unwrap().staging,
            report.staging
        );

        let mut anamnesis = draft(&case, ReportKind::Anamnesis);
        anamnesis.staging = Some(TnmStaging::parse("T1N0M0").unwrap());
        assert!(matches!(
            reports.create_report(&fleming, anamnesis),
            Err(HisError::InvalidInput(_))
        ));
    }

    #[test]
    fn reports_cannot_reference_orders_of_other_cases() {
        let hospital = TestHospital::new();
        let fleming = hospital.login("fleming");
        let case = case_of(&hospital, "van Gogh");
        let foreign_order = hospital.store.list::<Order>().remove(0);

        let mut report = draft(&case, ReportKind::Examination);
        report.order_id = Some(foreign_order.id);
        assert!(matches!(
            hospital.services.reports.create_report(&fleming, report),
            Err(HisError::InvalidInput(_))
        ));
    }

    #[test]
    fn imaging_must_match_the_case_patient() {
        let hospital = TestHospital::new();
        let reports = &hospital.services.reports;
        let fleming = hospital.login("fleming");
        let case = case_of(&hospital, "van Gogh");
        let other = case_of(&hospital, "Bohlen");
        let study = |patient_id: &ShardableUuid| ImagingStudy {
            modality: Modality::Ct,
            body_part: NonEmptyText::new("Thorax").unwrap(),
            study_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            patient_id: patient_id.clone(),
        };

        let mut mixed_up = draft(&case, ReportKind::Examination);
        mixed_up.imaging = Some(study(&other.patient_id));
        assert!(matches!(
            reports.create_report(&fleming, mixed_up),
            Err(HisError::InvalidInput(_))
        ));

        let mut examination = draft(&case, ReportKind::Examination);
        examination.imaging = Some(study(&case.patient_id));
        let report = reports.create_report(&fleming, examination).unwrap();
        let stored = hospital.store.load::<Report>(&report.id).unwrap();
        assert_eq!(stored.imaging, Some(study(&case.patient_id)));
    }

    #[test]
    fn report_access_follows_the_case() {
        let hospital = TestHospital::new();
        let reports = &hospital.services.reports;
        let case = case_of(&hospital, "Bohlen");

        // Koch works in internal medicine and has nothing to do with this case.
        assert!(matches!(
            reports.create_report(&hospital.login("koch"), draft(&case, ReportKind::Diagnosis)),
            Err(HisError::PermissionDenied(_))
        ));
        // Nurses only read reports.
        assert!(matches!(
            reports.create_report(&hospital.login("whitman"), draft(&case, ReportKind::Anamnesis)),
            Err(HisError::PermissionDenied(_))
        ));

        let report = reports
            .create_report(&hospital.login("fleming"), draft(&case, ReportKind::Anamnesis))
            .unwrap();

        let nurse = hospital.login("whitman");
        let listed = reports.list_reports(&nurse, Some(ReportKind::Anamnesis)).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(reports
            .list_reports(&nurse, Some(ReportKind::Therapy))
            .unwrap()
            .is_empty());
        assert!(reports.show_report(&hospital.login("nightingale"), &report.id).is_err());
        assert!(matches!(
            reports.list_reports(&hospital.login("hurtig"), None),
            Err(HisError::PermissionDenied(_))
        ));
    }
}
