use thiserror::Error;
use uuid::Uuid;

use super::checklist::{self, DocumentFacts};
use super::drafts::{
    keys, CommonDocs, DraftStore, ProjectDraft, PropertyDraft, ServiceSelection,
};

/// Screens of the registration and submission flow, in canonical forward
/// order. Branching (registration type, per-service sub-selection, charge
/// category) stays within this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Onboarding,
    RegistrationType,
    Register,
    IndividualRegistration,
    OrganizationRegistration,
    CreateProject,
    CreateProperty,
    PropertyReview,
    ServiceSelection,
    SubServiceSelection,
    UploadCommonDocuments,
    ReviewDocuments,
    SelectCharges,
    ChargeDetails,
    Payment,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationType {
    Individual,
    Organization,
}

/// Remote calls the stepper asks the gateway to perform at a transition
/// point. The stepper itself never talks to the network.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayAction {
    CreateProject {
        title: String,
        description: Option<String>,
    },
    CreateProperty {
        draft: PropertyDraft,
    },
    UpsertServiceRequest {
        main_service: String,
        sub_service: Option<String>,
    },
    SaveDraft {
        service_request_id: Uuid,
    },
    Submit {
        service_request_id: Uuid,
        required_doc_names: Vec<String>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("no project draft; return to project creation")]
    MissingProject,
    #[error("no property draft; return to property creation")]
    MissingProperty,
    #[error("no service selected")]
    MissingService,
    #[error("no active service request")]
    MissingServiceRequest,
    #[error("required documents incomplete: {0:?}")]
    IncompleteDocuments(Vec<String>),
}

/// What the stepper knows when deciding a transition, read once from the
/// draft store. Absence of a draft is normal; it only redirects.
#[derive(Debug, Default)]
pub struct WorkflowContext {
    pub session_active: bool,
    pub project: Option<ProjectDraft>,
    pub property: Option<PropertyDraft>,
    pub service: Option<ServiceSelection>,
    pub common_docs: Option<CommonDocs>,
    pub active_service_request: Option<Uuid>,
}

impl WorkflowContext {
    pub fn from_drafts(store: &DraftStore, session_active: bool) -> Self {
        Self {
            session_active,
            project: store.get(keys::CURRENT_PROJECT),
            property: store.get(keys::CURRENT_PROPERTY),
            service: store.get(keys::SELECTED_SERVICE),
            common_docs: store.get(keys::COMMON_DOCS),
            active_service_request: store.get(keys::ACTIVE_SERVICE_REQUEST),
        }
    }
}

/// Whether a step may be entered, and where to go instead when it may not.
/// `None` means entry is allowed.
pub fn entry_redirect(step: Step, ctx: &WorkflowContext) -> Option<Step> {
    use Step::*;

    // Pre-login screens are always reachable.
    if matches!(step, Onboarding | RegistrationType | Register) {
        return None;
    }
    if !ctx.session_active {
        return Some(Register);
    }

    match step {
        CreateProperty if ctx.project.is_none() => Some(CreateProject),
        PropertyReview | ServiceSelection | SubServiceSelection if ctx.property.is_none() => {
            Some(CreateProperty)
        }
        UploadCommonDocuments if ctx.service.is_none() => Some(ServiceSelection),
        ReviewDocuments
            if !ctx
                .common_docs
                .as_ref()
                .is_some_and(checklist::common_docs_complete) =>
        {
            Some(UploadCommonDocuments)
        }
        SelectCharges | ChargeDetails | Payment if ctx.active_service_request.is_none() => {
            Some(ReviewDocuments)
        }
        _ => None,
    }
}

/// The next screen on the canonical forward path.
pub fn next_step(step: Step, registration: RegistrationType) -> Step {
    use Step::*;
    match step {
        Onboarding => RegistrationType,
        RegistrationType => Register,
        Register => match registration {
            self::RegistrationType::Individual => IndividualRegistration,
            self::RegistrationType::Organization => OrganizationRegistration,
        },
        IndividualRegistration | OrganizationRegistration => CreateProject,
        CreateProject => CreateProperty,
        CreateProperty => PropertyReview,
        PropertyReview => ServiceSelection,
        ServiceSelection => SubServiceSelection,
        SubServiceSelection => UploadCommonDocuments,
        UploadCommonDocuments => ReviewDocuments,
        ReviewDocuments => SelectCharges,
        SelectCharges => ChargeDetails,
        ChargeDetails => Payment,
        Payment | Dashboard => Dashboard,
    }
}

/// Selecting a sub-service commits the flow: the locally drafted project and
/// property are reconciled into remote records, then the service request is
/// upserted. Nothing is persisted remotely before this point.
pub fn select_sub_service(
    ctx: &WorkflowContext,
    sub_service: &str,
) -> Result<Vec<GatewayAction>, WorkflowError> {
    let project = ctx.project.as_ref().ok_or(WorkflowError::MissingProject)?;
    let property = ctx
        .property
        .as_ref()
        .ok_or(WorkflowError::MissingProperty)?;
    let service = ctx.service.as_ref().ok_or(WorkflowError::MissingService)?;

    let mut actions = Vec::new();
    if project.remote_id.is_none() {
        actions.push(GatewayAction::CreateProject {
            title: project.title.clone(),
            description: project.description.clone(),
        });
    }
    if property.remote_id.is_none() {
        actions.push(GatewayAction::CreateProperty {
            draft: property.clone(),
        });
    }
    actions.push(GatewayAction::UpsertServiceRequest {
        main_service: service.main_service_label.clone(),
        sub_service: Some(sub_service.to_string()),
    });
    Ok(actions)
}

/// Terminal actions on the review screen. Draft skips the completeness gate;
/// submit enforces it and reports the offending names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Save,
    SaveAndSubmit,
}

pub fn review_outcome(
    ctx: &WorkflowContext,
    action: ReviewAction,
    documents: &[DocumentFacts],
) -> Result<GatewayAction, WorkflowError> {
    let service_request_id = ctx
        .active_service_request
        .ok_or(WorkflowError::MissingServiceRequest)?;
    let sub_service = ctx
        .service
        .as_ref()
        .and_then(|service| service.sub_service.as_deref())
        .unwrap_or_default();
    let required = checklist::required_documents(sub_service);

    match action {
        ReviewAction::Save => Ok(GatewayAction::SaveDraft { service_request_id }),
        ReviewAction::SaveAndSubmit => {
            let missing = checklist::missing_documents(required, documents);
            if !missing.is_empty() {
                return Err(WorkflowError::IncompleteDocuments(
                    missing.into_iter().map(str::to_string).collect(),
                ));
            }
            Ok(GatewayAction::Submit {
                service_request_id,
                required_doc_names: required.iter().map(|name| name.to_string()).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logged_in() -> WorkflowContext {
        WorkflowContext {
            session_active: true,
            ..Default::default()
        }
    }

    fn selection(sub: Option<&str>) -> ServiceSelection {
        ServiceSelection {
            main_service_id: "e-katha".into(),
            main_service_label: "E-katha".into(),
            sub_service: sub.map(str::to_string),
        }
    }

    #[test]
    fn context_reads_drafts_and_tolerates_corruption() {
        let mut store = DraftStore::new();
        store.put(keys::CURRENT_PROJECT, &ProjectDraft::new("Riverside", None));
        store.put_raw(keys::CURRENT_PROPERTY, "{corrupt");

        let ctx = WorkflowContext::from_drafts(&store, true);
        assert!(ctx.project.is_some());
        assert!(ctx.property.is_none());
        // The corrupt property draft sends the user back to the property
        // form, not into a crash.
        assert_eq!(
            entry_redirect(Step::ServiceSelection, &ctx),
            Some(Step::CreateProperty)
        );
    }

    #[test]
    fn property_step_redirects_without_a_project_draft() {
        let ctx = logged_in();
        assert_eq!(
            entry_redirect(Step::CreateProperty, &ctx),
            Some(Step::CreateProject)
        );
    }

    #[test]
    fn property_step_opens_once_a_project_exists() {
        let mut ctx = logged_in();
        ctx.project = Some(ProjectDraft::new("Riverside Block", None));
        assert_eq!(entry_redirect(Step::CreateProperty, &ctx), None);
    }

    #[test]
    fn service_screens_redirect_without_a_property() {
        let mut ctx = logged_in();
        ctx.project = Some(ProjectDraft::new("Riverside Block", None));
        for step in [
            Step::PropertyReview,
            Step::ServiceSelection,
            Step::SubServiceSelection,
        ] {
            assert_eq!(entry_redirect(step, &ctx), Some(Step::CreateProperty));
        }
    }

    #[test]
    fn review_waits_for_every_common_document_slot() {
        let mut ctx = logged_in();
        ctx.project = Some(ProjectDraft::new("Riverside Block", None));
        ctx.property = Some(PropertyDraft::new("Apartment", "Unit 4B"));
        ctx.service = Some(selection(Some("New E-Katha Registration")));

        let mut docs = CommonDocs::default();
        docs.record("Proof of Identity (Front)", "front.jpg");
        ctx.common_docs = Some(docs);
        assert_eq!(
            entry_redirect(Step::ReviewDocuments, &ctx),
            Some(Step::UploadCommonDocuments)
        );

        let mut docs = CommonDocs::default();
        for name in checklist::COMMON_DOCUMENTS {
            docs.record(name, "scan.jpg");
        }
        ctx.common_docs = Some(docs);
        assert_eq!(entry_redirect(Step::ReviewDocuments, &ctx), None);
    }

    #[test]
    fn session_loss_forces_the_login_step() {
        let ctx = WorkflowContext::default();
        assert_eq!(entry_redirect(Step::Dashboard, &ctx), Some(Step::Register));
        assert_eq!(entry_redirect(Step::Onboarding, &ctx), None);
    }

    #[test]
    fn registration_branches_by_type() {
        assert_eq!(
            next_step(Step::Register, RegistrationType::Individual),
            Step::IndividualRegistration
        );
        assert_eq!(
            next_step(Step::Register, RegistrationType::Organization),
            Step::OrganizationRegistration
        );
        assert_eq!(
            next_step(Step::OrganizationRegistration, RegistrationType::Organization),
            Step::CreateProject
        );
    }

    #[test]
    fn sub_service_selection_defers_remote_persistence_until_now() {
        let mut ctx = logged_in();
        ctx.project = Some(ProjectDraft::new("Riverside Block", None));
        ctx.property = Some(PropertyDraft::new("Apartment", "Unit 4B"));
        ctx.service = Some(selection(None));

        let actions = select_sub_service(&ctx, "New E-Katha Registration").unwrap();
        assert!(matches!(actions[0], GatewayAction::CreateProject { .. }));
        assert!(matches!(actions[1], GatewayAction::CreateProperty { .. }));
        assert!(matches!(
            actions[2],
            GatewayAction::UpsertServiceRequest { .. }
        ));
    }

    #[test]
    fn reconciled_drafts_are_not_recreated() {
        let mut ctx = logged_in();
        let mut project = ProjectDraft::new("Riverside Block", None);
        project.remote_id = Some(Uuid::new_v4());
        let mut property = PropertyDraft::new("Apartment", "Unit 4B");
        property.remote_id = Some(Uuid::new_v4());
        ctx.project = Some(project);
        ctx.property = Some(property);
        ctx.service = Some(selection(None));

        let actions = select_sub_service(&ctx, "Khata Bifurcation").unwrap();
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            actions[0],
            GatewayAction::UpsertServiceRequest { .. }
        ));
    }

    #[test]
    fn sub_service_selection_fails_without_drafts_and_calls_nothing() {
        let ctx = logged_in();
        assert_eq!(
            select_sub_service(&ctx, "New E-Katha Registration"),
            Err(WorkflowError::MissingProject)
        );
    }

    #[test]
    fn save_skips_the_completeness_gate() {
        let mut ctx = logged_in();
        let request_id = Uuid::new_v4();
        ctx.active_service_request = Some(request_id);
        ctx.service = Some(selection(Some("New E-Katha Registration")));

        let outcome = review_outcome(&ctx, ReviewAction::Save, &[]).unwrap();
        assert_eq!(
            outcome,
            GatewayAction::SaveDraft {
                service_request_id: request_id
            }
        );
    }

    #[test]
    fn submit_is_gated_and_names_the_missing_documents() {
        let mut ctx = logged_in();
        ctx.active_service_request = Some(Uuid::new_v4());
        ctx.service = Some(selection(Some("New E-Katha Registration")));

        let documents = vec![DocumentFacts {
            name: "Pan Card".into(),
            uploaded: true,
            not_available: false,
            document_id: Some(Uuid::new_v4()),
        }];

        match review_outcome(&ctx, ReviewAction::SaveAndSubmit, &documents) {
            Err(WorkflowError::IncompleteDocuments(missing)) => {
                assert_eq!(
                    missing,
                    vec!["Aadhar Card", "Birth Certificate", "Sale Deed", "Land Deed"]
                );
            }
            other => panic!("expected incomplete documents, got {other:?}"),
        }
    }

    #[test]
    fn submit_passes_when_every_required_document_is_covered() {
        let mut ctx = logged_in();
        ctx.active_service_request = Some(Uuid::new_v4());
        ctx.service = Some(selection(Some("New E-Katha Registration")));

        let documents: Vec<DocumentFacts> =
            checklist::required_documents("New E-Katha Registration")
                .iter()
                .enumerate()
                .map(|(idx, name)| DocumentFacts {
                    name: name.to_string(),
                    uploaded: idx % 2 == 0,
                    not_available: idx % 2 == 1,
                    document_id: Some(Uuid::new_v4()),
                })
                .collect();

        let outcome = review_outcome(&ctx, ReviewAction::SaveAndSubmit, &documents).unwrap();
        assert!(matches!(outcome, GatewayAction::Submit { .. }));
    }
}
