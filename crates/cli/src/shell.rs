//! The interactive `his shell`.
//!
//! A login loop followed by a `> ` prompt. Commands take an entity type and, where needed, an
//! identifier; identifiers may be abbreviated to a unique prefix. Errors from the services
//! are printed and the prompt comes back.

use crate::prompt::{parse_date, PromptError, PromptResult, Terminal};
use crate::render::{self, Names};
use chrono::{NaiveDateTime, TimeZone, Utc};
use his_core::models::accounts::{
    Account, AdministrativeRank, DoctorRank, EmployeeKind, EmployeeRole, GeneralRank, NurseRank,
    PersonnelFunction,
};
use his_core::models::common::{Address, Gender, Person};
use his_core::models::medical::Discipline;
use his_core::models::objects::{Department, Patient, Room};
use his_core::models::staging::{ImagingStudy, Modality, Resection, TnmStaging};
use his_core::models::tasks::{Act, Case, Order, OrderDetails, OrderKind, Report, ReportDraft, ReportKind};
use his_core::models::Record;
use his_core::permissions::{has_case_perm, has_model_perm, is_privileged, EntityKind, PermAction};
use his_core::services::NewEmployee;
use his_core::{HisError, HisResult, HisServices};
use his_types::NonEmptyText;
use his_uuid::ShardableUuid;
use std::io::{self, BufRead, Write};

const HELP: &str = "
possible commands:

list <entity_type>              - list all entities you have access to
create <entity_type>            - create entities, e.g. 'create patient'
show <entity_type> <identifier> - show details for an entity
assign <case_id>                - assign a doctor to a case
assign order <order_id>         - assign an order to a colleague
close <entity_type> <id>        - close a case, act or order
reopen case <id>                - reopen a closed case
activate employee <id>          - let an employee log in again
deactivate employee <id>        - lock an employee out
passwd                          - change your password

possible entity_types:

case, patient, act, order, department, room, employee, qualification
report                          - anamnesis reports
<kind>report                    - kind ::= [ any | anamnesis | diagnosis | examination | therapy | findings ]

identifiers are ids or unique prefixes of at least 4 characters

? for help, q to quit
";

const NO_RIGHTS: &str = "You don't have sufficient rights to do this.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntityType {
    Case,
    Patient,
    Act,
    Order,
    /// `None` lists every kind.
    Report(Option<ReportKind>),
    Qualification,
    Department,
    Room,
    Employee,
}

impl EntityType {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "case" => Self::Case,
            "patient" => Self::Patient,
            "act" => Self::Act,
            "order" => Self::Order,
            "report" => Self::Report(Some(ReportKind::Anamnesis)),
            "anyreport" => Self::Report(None),
            "qualification" => Self::Qualification,
            "department" => Self::Department,
            "room" => Self::Room,
            "employee" => Self::Employee,
            other => Self::Report(Some(other.strip_suffix("report")?.parse().ok()?)),
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error("command not found: {0}")]
    UnknownCommand(String),
    #[error("missing valid entity type: {0}")]
    MissingEntityType(String),
    #[error("missing valid identifier: {0}")]
    MissingIdentifier(String),
    #[error(transparent)]
    His(#[from] HisError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl From<io::Error> for CommandError {
    fn from(e: io::Error) -> Self {
        Self::Prompt(e.into())
    }
}

type CommandResult = Result<(), CommandError>;

fn denied(what: &str) -> CommandError {
    CommandError::His(HisError::PermissionDenied(what.to_string()))
}

/// `"Rank (chief, senior, ...): "` for a coded choice.
fn choice_prompt<T: Copy>(what: &str, all: &[T], code: fn(T) -> &'static str) -> String {
    let codes: Vec<&str> = all.iter().map(|v| code(*v)).collect();
    format!("{what} ({}): ", codes.join(", "))
}

fn parse_timestamp(input: &str) -> HisResult<chrono::DateTime<Utc>> {
    NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M")
        .map(|t| Utc.from_utc_datetime(&t))
        .map_err(|_| HisError::InvalidInput("please use YYYY-MM-DD HH:MM".into()))
}

pub struct Shell<R, W> {
    services: HisServices,
    term: Terminal<R, W>,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(services: HisServices, input: R, output: W) -> Self {
        Self {
            services,
            term: Terminal::new(input, output),
        }
    }

    pub fn into_output(self) -> W {
        self.term.into_output()
    }

    /// Runs the session until `q` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        match self.session() {
            Ok(()) | Err(PromptError::EndOfInput) => {}
            Err(PromptError::Io(e)) => return Err(e),
        }
        self.term.print("Good bye!")
    }

    fn session(&mut self) -> PromptResult<()> {
        let actor = self.login()?;
        tracing::info!("{} logged in to the shell", actor.username);
        self.term.print(format_args!(
            "Welcome, {}. Type ? for help.",
            actor.display_name()
        ))?;

        loop {
            let line = self.term.line("> ")?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some((&command, args)) = tokens.split_first() else {
                continue;
            };
            if command == "q" {
                return Ok(());
            }

            match self.execute(&actor, command, args, &tokens.join(" ")) {
                Ok(()) => {}
                Err(CommandError::Prompt(e)) => return Err(e),
                Err(
                    e @ (CommandError::UnknownCommand(_)
                    | CommandError::MissingEntityType(_)
                    | CommandError::MissingIdentifier(_)),
                ) => {
                    self.term.print(e)?;
                    self.term.print(HELP)?;
                }
                Err(CommandError::His(HisError::PermissionDenied(_))) => {
                    self.term.print(NO_RIGHTS)?;
                }
                Err(CommandError::His(e)) => self.term.print(e)?,
            }
        }
    }

    fn login(&mut self) -> PromptResult<Account> {
        loop {
            let username = self.term.line("HIS login: ")?;
            let password = self.term.line("Password: ")?;
            match self.services.auth.authenticate(&username, &password) {
                Ok(account) => return Ok(account),
                Err(HisError::InvalidCredentials) => {}
                Err(e) => tracing::warn!("login failed: {e}"),
            }
            self.term.print("Login incorrect")?;
        }
    }

    fn execute(&mut self, actor: &Account, command: &str, args: &[&str], line: &str) -> CommandResult {
        let entity_type = || {
            args.first()
                .and_then(|token| EntityType::parse(token))
                .ok_or_else(|| CommandError::MissingEntityType(line.to_string()))
        };
        let identifier = |index: usize| {
            args.get(index)
                .copied()
                .ok_or_else(|| CommandError::MissingIdentifier(line.to_string()))
        };

        match command {
            "?" => self.term.print(HELP)?,
            "list" => self.list(actor, entity_type()?)?,
            "create" => self.create(actor, entity_type()?)?,
            "show" => {
                let entity = entity_type()?;
                self.show(actor, entity, identifier(1)?)?;
            }
            "assign" => match args {
                ["order", id, ..] => self.assign_order(actor, id)?,
                [id, ..] => self.assign_case(actor, id)?,
                [] => return Err(CommandError::MissingIdentifier(line.to_string())),
            },
            "close" => {
                let entity = entity_type()?;
                self.close(actor, entity, identifier(1)?, line)?;
            }
            "reopen" => {
                if entity_type()? != EntityType::Case {
                    return Err(CommandError::MissingEntityType(line.to_string()));
                }
                let id = self.resolve::<Case>(identifier(1)?)?;
                let case = self.services.cases.reopen_case(actor, &id)?;
                self.term.print(format_args!("Reopened case {}", case.id))?;
            }
            "activate" | "deactivate" => {
                if entity_type()? != EntityType::Employee {
                    return Err(CommandError::MissingEntityType(line.to_string()));
                }
                let id = self.resolve_account(identifier(1)?)?;
                let active = command == "activate";
                let account = self.services.accounts.set_active(actor, &id, active)?;
                self.term.print(format_args!(
                    "{} is now {}",
                    account.username,
                    if account.is_active { "active" } else { "inactive" }
                ))?;
            }
            "passwd" => self.change_password(actor)?,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        }
        Ok(())
    }

    fn resolve<T: Record>(&self, input: &str) -> HisResult<ShardableUuid> {
        self.services.store().resolve_id::<T>(input)
    }

    /// A username or an account id.
    fn resolve_account(&self, input: &str) -> HisResult<ShardableUuid> {
        match self.services.accounts.find_by_username(input) {
            Some(account) => Ok(account.id),
            None => self.resolve::<Account>(input),
        }
    }

    fn names(&self) -> Names {
        Names::load(self.services.store())
    }

    fn list(&mut self, actor: &Account, entity: EntityType) -> CommandResult {
        let s = &self.services;
        let names = Names::load(s.store());
        let lines: Vec<String> = match entity {
            EntityType::Case => s.cases.list_cases(actor)?.iter().map(|c| names.case_line(c)).collect(),
            EntityType::Patient => s
                .patients
                .list_patients(actor)?
                .iter()
                .map(render::patient_line)
                .collect(),
            EntityType::Act => s.cases.list_acts(actor)?.iter().map(|a| names.act_line(a)).collect(),
            EntityType::Order => s
                .orders
                .list_orders(actor, None)?
                .iter()
                .map(|o| names.order_line(o))
                .collect(),
            EntityType::Report(kind) => s
                .reports
                .list_reports(actor, kind)?
                .iter()
                .map(|r| names.report_line(r))
                .collect(),
            EntityType::Qualification => s
                .facility
                .list_department_qualifications(actor)?
                .iter()
                .map(|q| names.qualification_line(q))
                .collect(),
            EntityType::Department => s
                .facility
                .list_departments(actor)?
                .iter()
                .map(render::department_line)
                .collect(),
            EntityType::Room => s.facility.list_rooms(actor)?.iter().map(|r| names.room_line(r)).collect(),
            EntityType::Employee => s
                .accounts
                .list_employees(actor)
                .iter()
                .map(|a| names.employee_line(a))
                .collect(),
        };

        self.term.print(format_args!("# of records: {}", lines.len()))?;
        if lines.is_empty() && matches!(entity, EntityType::Report(_)) {
            self.term.print("maybe try entity_type anyreport")?;
        }
        for line in lines {
            self.term.print(line)?;
        }
        Ok(())
    }

    fn show(&mut self, actor: &Account, entity: EntityType, input: &str) -> CommandResult {
        let names = self.names();
        let s = self.services.clone();
        let text = match entity {
            EntityType::Case => {
                let case = s.cases.show_case(actor, &self.resolve::<Case>(input)?)?;
                let last = s.cases.last_room(&case)?;
                let next = s.cases.next_room(&case)?;
                names.case_details(&case, last.as_ref(), next.as_ref())
            }
            EntityType::Patient => {
                let details = s.patients.show_patient(actor, &self.resolve::<Patient>(input)?)?;
                names.patient_details(&details)
            }
            EntityType::Act => names.act_details(&s.cases.show_act(actor, &self.resolve::<Act>(input)?)?),
            EntityType::Order => {
                names.order_details(&s.orders.show_order(actor, &self.resolve::<Order>(input)?)?)
            }
            EntityType::Report(kind) => {
                let report = s.reports.show_report(actor, &self.resolve::<Report>(input)?)?;
                if kind.is_some_and(|k| k != report.kind) {
                    self.term.print(
                        "Not found a report of this kind with this id, have you chosen the right report type?\n\
                         Alternatively try the anyreport type",
                    )?;
                    return Ok(());
                }
                names.report_details(&report)
            }
            EntityType::Department => {
                let department = s
                    .facility
                    .show_department(actor, &self.resolve::<Department>(input)?)?;
                render::department_line(&department)
            }
            EntityType::Room => names.room_line(&s.facility.show_room(actor, &self.resolve::<Room>(input)?)?),
            EntityType::Employee => {
                let account = s.accounts.show_employee(actor, &self.resolve_account(input)?)?;
                names.employee_details(&account, &s.accounts.qualifications(&account.id))
            }
            EntityType::Qualification => {
                return Err(CommandError::MissingEntityType(format!("show qualification {input}")))
            }
        };
        self.term.print(text)?;
        Ok(())
    }

    fn close(&mut self, actor: &Account, entity: EntityType, input: &str, line: &str) -> CommandResult {
        let (kind, id) = match entity {
            EntityType::Case => {
                let case = self.services.cases.close_case(actor, &self.resolve::<Case>(input)?)?;
                (Case::KIND, case.id)
            }
            EntityType::Act => {
                let act = self.services.cases.close_act(actor, &self.resolve::<Act>(input)?)?;
                (Act::KIND, act.id)
            }
            EntityType::Order => {
                let order = self.services.orders.close_order(actor, &self.resolve::<Order>(input)?)?;
                (Order::KIND, order.id)
            }
            _ => return Err(CommandError::MissingEntityType(line.to_string())),
        };
        self.term.print(format_args!("Closed {kind} {id}"))?;
        Ok(())
    }

    fn assign_case(&mut self, actor: &Account, input: &str) -> CommandResult {
        let case = self.services.cases.show_case(actor, &self.resolve::<Case>(input)?)?;
        if !(is_privileged(actor) || has_case_perm(actor, PermAction::Change, &case)) {
            return Err(denied("assign this case"));
        }

        let names = self.names();
        self.term.print("Available doctors:")?;
        for doctor in self.services.accounts.list_doctors() {
            self.term.print(names.employee_line(&doctor))?;
        }

        let services = self.services.clone();
        let doctor_id = self.term.parsed("Enter id of doctor to assign the case to: ", |input| {
            match services.accounts.find_by_username(input) {
                Some(account) => Ok(account.id),
                None => services.store().resolve_id::<Account>(input),
            }
        })?;
        let case = services.cases.assign_doctor(actor, &case.id, &doctor_id)?;
        self.term.print(format_args!(
            "Assigned {} to case {}",
            names.employee_line(&services.store().load::<Account>(&doctor_id)?),
            case.id
        ))?;
        Ok(())
    }

    fn assign_order(&mut self, actor: &Account, input: &str) -> CommandResult {
        let order = self.services.orders.show_order(actor, &self.resolve::<Order>(input)?)?;
        let services = self.services.clone();
        let assignee = self.term.parsed("Assign the order to (username or id): ", |input| {
            match services.accounts.find_by_username(input) {
                Some(account) => Ok(account.id),
                None => services.store().resolve_id::<Account>(input),
            }
        })?;
        let order = services.orders.assign_order(actor, &order.id, &assignee)?;
        self.term.print(format_args!("Assigned {} order {}", order.kind().code(), order.id))?;
        Ok(())
    }

    fn change_password(&mut self, actor: &Account) -> CommandResult {
        let password = self.term.required("New password: ")?;
        let again = self.term.line("Retype new password: ")?;
        if password != again.trim() {
            self.term.print("Sorry, passwords do not match.")?;
            return Ok(());
        }
        self.services.accounts.set_password(actor, &actor.id, &password)?;
        self.term.print("Password updated.")?;
        Ok(())
    }

    fn create(&mut self, actor: &Account, entity: EntityType) -> CommandResult {
        let allowed = |model| has_model_perm(actor, PermAction::Add, model);
        let permitted = match entity {
            EntityType::Case => allowed(EntityKind::Case),
            EntityType::Patient => allowed(EntityKind::Patient),
            EntityType::Act => allowed(EntityKind::Act),
            EntityType::Report(_) => allowed(EntityKind::Report),
            EntityType::Qualification => allowed(EntityKind::DepartmentQualification),
            EntityType::Department => allowed(EntityKind::Department),
            EntityType::Room => allowed(EntityKind::Room),
            EntityType::Order => OrderKind::ALL
                .iter()
                .any(|k| allowed(EntityKind::for_order(*k))),
            EntityType::Employee => EmployeeKind::ALL
                .iter()
                .any(|k| allowed(EntityKind::for_employee(*k))),
        };
        if !permitted {
            return Err(denied("create records of this kind"));
        }

        let names = self.names();
        let services = self.services.clone();
        let created = match entity {
            EntityType::Patient => {
                let patient = self.create_patient(actor)?;
                render::patient_line(&patient)
            }
            EntityType::Case => {
                let patient_id = if self.term.yes_no("Create new Patient?")? {
                    self.create_patient(actor)?.id
                } else {
                    self.term.parsed(
                        "Please enter patient id to associate with the case: ",
                        |input| services.store().resolve_id::<Patient>(input),
                    )?
                };
                let department_id = self.ask_department("Department: ")?;
                let case = services.cases.create_case(actor, &patient_id, &department_id)?;
                Names::load(services.store()).case_line(&case)
            }
            EntityType::Act => {
                let case_id = self.term.parsed("Case id: ", |input| {
                    services.store().resolve_id::<Case>(input)
                })?;
                let executing = self.ask_department("Executing department: ")?;
                names.act_line(&services.cases.create_act(actor, &case_id, &executing)?)
            }
            EntityType::Report(kind) => names.report_line(&self.create_report(actor, kind)?),
            EntityType::Qualification => {
                let department_id = self.ask_department("Department: ")?;
                let discipline: Discipline = self
                    .term
                    .parsed("Discipline code: ", |input| input.parse())?;
                let qualification =
                    services
                        .facility
                        .add_department_qualification(actor, &department_id, discipline)?;
                names.qualification_line(&qualification)
            }
            EntityType::Department => {
                let name = self.term.required("Name: ")?;
                render::department_line(&services.facility.create_department(actor, &name)?)
            }
            EntityType::Room => {
                let name = self.term.required("Name: ")?;
                let department = self.term.optional_parsed("Department (blank if none): ", |input| {
                    services
                        .facility
                        .find_department_by_name(input)
                        .map(|d| d.id)
                        .ok_or_else(|| HisError::InvalidInput(format!("no department named '{input}'")))
                })?;
                let capacity: u32 = self.term.parsed("Capacity: ", |input| {
                    input
                        .parse()
                        .map_err(|_| HisError::InvalidInput("capacity must be a whole number".into()))
                })?;
                let room = services
                    .facility
                    .create_room(actor, &name, department.as_ref(), capacity)?;
                Names::load(services.store()).room_line(&room)
            }
            EntityType::Order => return self.create_order(actor),
            EntityType::Employee => return self.create_employee(actor),
        };
        self.term.print(format_args!("Successfully created {created}"))?;
        Ok(())
    }

    fn ask_department(&mut self, prompt: &str) -> PromptResult<ShardableUuid> {
        let facility = self.services.facility.clone();
        self.term.parsed(prompt, |input| {
            facility
                .find_department_by_name(input)
                .map(|d| d.id)
                .ok_or_else(|| HisError::InvalidInput(format!("no department named '{input}'")))
        })
    }

    fn ask_room(&mut self, actor: &Account, prompt: &str) -> PromptResult<ShardableUuid> {
        let services = self.services.clone();
        self.term.parsed(prompt, |input| {
            let rooms = services.facility.list_rooms(actor)?;
            match rooms.into_iter().find(|r| r.name.as_str().eq_ignore_ascii_case(input)) {
                Some(room) => Ok(room.id),
                None => services.store().resolve_id::<Room>(input),
            }
        })
    }

    fn ask_person(&mut self) -> PromptResult<HisResult<Person>> {
        let gender: Gender = self.term.parsed("Gender (m, w, d): ", |input| input.parse())?;
        let title = self.term.optional("Title (blank if none): ")?;
        let first_name = self.term.required("First Name: ")?;
        let last_name = self.term.required("Last Name: ")?;
        let date_of_birth = self.term.optional_parsed(
            "Date of birth in ISO-format (YYYY-MM-DD)\nLeave blank if unknown: ",
            parse_date,
        )?;
        Ok(Person::new(
            gender,
            title.as_deref(),
            &first_name,
            &last_name,
            date_of_birth,
        ))
    }

    fn ask_address(&mut self) -> PromptResult<HisResult<Address>> {
        let street = self.term.required("Street: ")?;
        let number: u32 = self.term.parsed("Street number: ", |input| {
            input
                .parse()
                .map_err(|_| HisError::InvalidInput("street number must be a whole number".into()))
        })?;
        let zip_code = self.term.required("Zip code: ")?;
        let city = self.term.required("City: ")?;
        Ok(Address::new(&street, number, &zip_code, &city))
    }

    fn create_patient(&mut self, actor: &Account) -> Result<Patient, CommandError> {
        let person = self.ask_person()??;
        let address = if self.term.yes_no("Add an address?")? {
            Some(self.ask_address()??)
        } else {
            None
        };
        Ok(self.services.patients.create_patient(actor, person, address)?)
    }

    fn create_order(&mut self, actor: &Account) -> CommandResult {
        let services = self.services.clone();
        let act_id = self
            .term
            .parsed("Act id: ", |input| services.store().resolve_id::<Act>(input))?;
        let kind: OrderKind = self.term.parsed(
            &choice_prompt("Order kind", OrderKind::ALL, OrderKind::code),
            |input| input.parse(),
        )?;

        let details = match kind {
            OrderKind::Transport => {
                let from_room = self.ask_room(actor, "From room (name or id): ")?;
                let to_room = self.ask_room(actor, "To room (name or id): ")?;
                let requested_arrival_by = self.term.optional_parsed(
                    "Requested arrival, UTC (YYYY-MM-DD HH:MM, blank if none): ",
                    parse_timestamp,
                )?;
                let supervised = self.term.yes_no("Supervised?")?;
                let supervised_by = if supervised {
                    self.term.optional_parsed("Supervising doctor (username, blank if any): ", |input| {
                        services
                            .accounts
                            .find_by_username(input)
                            .map(|a| a.id)
                            .ok_or_else(|| HisError::InvalidInput(format!("no account named '{input}'")))
                    })?
                } else {
                    None
                };
                OrderDetails::Transport {
                    from_room,
                    to_room,
                    requested_arrival_by,
                    supervised,
                    supervised_by,
                }
            }
            OrderKind::Transfer => {
                let act = services.cases.show_act(actor, &act_id)?;
                let case = services.store().load::<Case>(&act.case_id)?;
                OrderDetails::Transfer {
                    from_department: case.assigned_department_id,
                    to_department: self.ask_department("To department: ")?,
                }
            }
            OrderKind::Treatment | OrderKind::Examination => {
                let description: NonEmptyText =
                    self.term.parsed("Description: ", |input| Ok(input.parse()?))?;
                let discipline: Option<Discipline> = self
                    .term
                    .optional_parsed("Discipline code (blank if none): ", |input| input.parse())?;
                if kind == OrderKind::Treatment {
                    OrderDetails::Treatment {
                        description,
                        discipline,
                    }
                } else {
                    OrderDetails::Examination {
                        description,
                        discipline,
                    }
                }
            }
        };

        let order = services.orders.create_order(actor, &act_id, details)?;
        self.term.print(format_args!(
            "Successfully created {}",
            Names::load(services.store()).order_line(&order)
        ))?;
        Ok(())
    }

    fn create_report(&mut self, actor: &Account, kind: Option<ReportKind>) -> Result<Report, CommandError> {
        let kind = match kind {
            Some(kind) => kind,
            None => self.term.parsed(
                &choice_prompt("Report kind", ReportKind::ALL, ReportKind::code),
                |input| input.parse(),
            )?,
        };

        let services = self.services.clone();
        let names = self.names();
        self.term.print("Your cases are: ")?;
        for case in services.cases.list_cases(actor)? {
            self.term.print(names.case_line(&case))?;
        }

        let case_id = self.term.parsed("Enter id of case you are reporting on: ", |input| {
            services.store().resolve_id::<Case>(input)
        })?;
        let order_id = self.term.optional_parsed("Order id (blank if none): ", |input| {
            services.store().resolve_id::<Order>(input)
        })?;
        let text = self.term.required("Enter report text: ")?;

        let staging = if kind.allows_staging() && self.term.yes_no("Staging necessary?")? {
            Some(self.term.parsed(
                "Please enter valid TNM string (case sensitive): ",
                TnmStaging::parse,
            )?)
        } else {
            None
        };
        let resection = if kind.allows_resection() && self.term.yes_no("Tissue extracted?")? {
            let organ: NonEmptyText = self
                .term
                .parsed("Organ from which tissue was extracted: ", |input| Ok(input.parse()?))?;
            let resected_on = self
                .term
                .optional_parsed(
                    "Date of resection in ISO-format (YYYY-MM-DD)\nLeave blank for today: ",
                    parse_date,
                )?
                .unwrap_or_else(|| Utc::now().date_naive());
            Some(Resection { organ, resected_on })
        } else {
            None
        };
        let imaging = if kind.allows_imaging() && self.term.yes_no("Images attached?")? {
            let modality = self.term.parsed(
                &choice_prompt("Modality", Modality::ALL, Modality::code),
                |input| input.parse(),
            )?;
            let body_part: NonEmptyText = self
                .term
                .parsed("Examined body part: ", |input| Ok(input.parse()?))?;
            let study_date = self
                .term
                .optional_parsed(
                    "Date of the study in ISO-format (YYYY-MM-DD)\nLeave blank for today: ",
                    parse_date,
                )?
                .unwrap_or_else(|| Utc::now().date_naive());
            let patient_id = services.cases.show_case(actor, &case_id)?.patient_id;
            Some(ImagingStudy {
                modality,
                body_part,
                study_date,
                patient_id,
            })
        } else {
            None
        };

        Ok(services.reports.create_report(
            actor,
            ReportDraft {
                case_id,
                order_id,
                kind,
                text,
                staging,
                resection,
                imaging,
            },
        )?)
    }

    fn create_employee(&mut self, actor: &Account) -> CommandResult {
        let username = self.term.optional("Username (blank to generate): ")?;
        let email = self.term.optional("Email (blank if none): ")?;
        let password = self.term.required("Password: ")?;
        let person = self.ask_person()??;
        let address = self.ask_address()??;
        let department_id = self.ask_department("Department: ")?;

        let kind: EmployeeKind = self.term.parsed(
            &choice_prompt("Staff group", EmployeeKind::ALL, EmployeeKind::code),
            |input| input.parse(),
        )?;
        let role = match kind {
            EmployeeKind::Administrative => EmployeeRole::Administrative {
                rank: self.term.parsed(
                    &choice_prompt("Rank", AdministrativeRank::ALL, AdministrativeRank::code),
                    |input| input.parse(),
                )?,
            },
            EmployeeKind::Doctor => EmployeeRole::Doctor {
                rank: self.term.parsed(
                    &choice_prompt("Rank", DoctorRank::ALL, DoctorRank::code),
                    |input| input.parse(),
                )?,
            },
            EmployeeKind::Nurse => EmployeeRole::Nurse {
                rank: self.term.parsed(
                    &choice_prompt("Rank", NurseRank::ALL, NurseRank::code),
                    |input| input.parse(),
                )?,
            },
            EmployeeKind::GeneralPersonnel => EmployeeRole::GeneralPersonnel {
                rank: self.term.parsed(
                    &choice_prompt("Rank", GeneralRank::ALL, GeneralRank::code),
                    |input| input.parse(),
                )?,
                function: self.term.parsed(
                    &choice_prompt("Function", PersonnelFunction::ALL, PersonnelFunction::code),
                    |input| input.parse(),
                )?,
            },
        };

        let account = self.services.accounts.create_employee(
            actor,
            NewEmployee {
                username,
                email,
                password,
                person,
                address,
                department_id,
                role,
            },
        )?;
        let created = self.names().employee_line(&account);
        self.term.print(format_args!("Successfully created {created}"))?;
        Ok(())
    }
}
