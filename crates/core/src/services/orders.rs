use super::ensure;
use crate::author::Author;
use crate::error::{HisError, HisResult};
use crate::models::accounts::{Account, PersonnelFunction};
use crate::models::objects::{Department, Room};
use crate::models::tasks::{Act, Case, Order, OrderDetails, OrderKind};
use crate::models::Record;
use crate::permissions::{has_model_perm, has_order_perm, EntityKind, PermAction};
use crate::store::{ChangeSet, Store};
use crate::versioned_files::{HisCommitAction, HisCommitDomain};
use his_uuid::ShardableUuid;
use std::collections::HashMap;
use std::sync::Arc;

/// Transport, transfer, treatment and examination orders.
#[derive(Clone, Debug)]
pub struct OrderService {
    store: Arc<Store>,
}

impl OrderService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// The order together with the act and case it belongs to.
    fn load_with_context(&self, order_id: &ShardableUuid) -> HisResult<(Order, Act, Case)> {
        let order = self.store.load::<Order>(order_id)?;
        let act = self.store.load::<Act>(&order.act_id)?;
        let case = self.store.load::<Case>(&act.case_id)?;
        Ok((order, act, case))
    }

    fn active_doctor(&self, id: &ShardableUuid) -> HisResult<Account> {
        let account = self.store.load::<Account>(id)?;
        if account.is_doctor() && account.is_active {
            Ok(account)
        } else {
            Err(HisError::InvalidInput(format!(
                "{} is not an active doctor",
                account.username
            )))
        }
    }

    /// Issues an order within an open act.
    ///
    /// # Errors
    ///
    /// Besides the checks of [`OrderDetails::validate`]: referenced rooms and departments must
    /// exist, a supervisor must be an active doctor, and a transfer must start from the case's
    /// current department.
    pub fn create_order(
        &self,
        actor: &Account,
        act_id: &ShardableUuid,
        details: OrderDetails,
    ) -> HisResult<Order> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let act = tx.load::<Act>(act_id)?;
            let case = tx.load::<Case>(&act.case_id)?;
            if act.lifecycle.is_closed() {
                return Err(HisError::AlreadyClosed { kind: Act::KIND });
            }
            if case.lifecycle.is_closed() {
                return Err(HisError::AlreadyClosed { kind: Case::KIND });
            }

            let order = Order::new(act.id.clone(), actor.id.clone(), details)?;
            ensure(
                has_order_perm(actor, PermAction::Add, &order, &act, &case),
                actor,
                "issue orders for this act",
            )?;

            match &order.details {
                OrderDetails::Transport {
                    from_room,
                    to_room,
                    supervised_by,
                    ..
                } => {
                    tx.load::<Room>(from_room)?;
                    tx.load::<Room>(to_room)?;
                    if let Some(doctor_id) = supervised_by {
                        self.active_doctor(doctor_id)?;
                    }
                }
                OrderDetails::Transfer {
                    from_department,
                    to_department,
                } => {
                    if *from_department != case.assigned_department_id {
                        return Err(HisError::InvalidInput(
                            "transfer must start from the case's current department".into(),
                        ));
                    }
                    tx.load::<Department>(to_department)?;
                }
                OrderDetails::Treatment { .. } | OrderDetails::Examination { .. } => {}
            }

            tx.save(
                &author,
                HisCommitDomain::Order,
                HisCommitAction::Create,
                &format!("Issued {} order", order.kind().code()),
                &order,
            )?;
            Ok(order)
        })
    }

    /// Hands an order to an active employee. Transport orders go to transport staff only.
    pub fn assign_order(
        &self,
        actor: &Account,
        order_id: &ShardableUuid,
        assignee_id: &ShardableUuid,
    ) -> HisResult<Order> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let (mut order, act, case) = self.load_with_context(order_id)?;
            ensure(
                has_order_perm(actor, PermAction::Change, &order, &act, &case),
                actor,
                "change this order",
            )?;

            let assignee = tx.load::<Account>(assignee_id)?;
            let Some(employee) = assignee.employee.as_ref().filter(|_| assignee.is_active) else {
                return Err(HisError::InvalidInput(format!(
                    "{} is not an active employee",
                    assignee.username
                )));
            };
            if order.kind() == OrderKind::Transport
                && employee.role.function() != Some(PersonnelFunction::Transport)
            {
                return Err(HisError::InvalidInput(format!(
                    "{} does not do patient transport",
                    assignee.username
                )));
            }

            order.assign(assignee.id.clone())?;
            tx.save(
                &author,
                HisCommitDomain::Order,
                HisCommitAction::Update,
                &format!("Assigned order to {}", assignee.username),
                &order,
            )?;
            Ok(order)
        })
    }

    /// Closes an order and applies its effect in the same commit: a transport moves the
    /// patient's place from one room to the other, a transfer moves the case to the new
    /// department.
    ///
    /// # Errors
    ///
    /// Returns `HisError::RoomFull` if the destination room has no free place; nothing is
    /// written then.
    pub fn close_order(&self, actor: &Account, order_id: &ShardableUuid) -> HisResult<Order> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let (mut order, act, mut case) = self.load_with_context(order_id)?;
            ensure(
                has_order_perm(actor, PermAction::Change, &order, &act, &case),
                actor,
                "change this order",
            )?;

            order.lifecycle.close(Order::KIND)?;
            let mut changes = ChangeSet::new();
            match &order.details {
                OrderDetails::Transport {
                    from_room, to_room, ..
                } => {
                    let mut from = tx.load::<Room>(from_room)?;
                    let mut to = tx.load::<Room>(to_room)?;
                    to.occupy()?;
                    if from.usage == 0 {
                        tracing::warn!(
                            "room {} has no patient to release for order {}",
                            from.name,
                            order.id
                        );
                    } else {
                        from.release()?;
                        changes.put(&from)?;
                    }
                    changes.put(&to)?;
                }
                OrderDetails::Transfer { to_department, .. } => {
                    case.assigned_department_id = to_department.clone();
                    case.lifecycle.stamps.touch();
                    changes.put(&case)?;
                }
                OrderDetails::Treatment { .. } | OrderDetails::Examination { .. } => {}
            }
            changes.put(&order)?;

            tx.commit(
                &author,
                HisCommitDomain::Order,
                HisCommitAction::Close,
                &format!("Closed {} order", order.kind().code()),
                changes,
            )?;
            Ok(order)
        })
    }

    /// Orders the actor may view, optionally of one kind only, oldest first.
    pub fn list_orders(&self, actor: &Account, kind: Option<OrderKind>) -> HisResult<Vec<Order>> {
        let kinds: Vec<OrderKind> = match kind {
            Some(kind) => vec![kind],
            None => OrderKind::ALL.to_vec(),
        };
        ensure(
            kinds.iter().any(|&k| {
                has_model_perm(actor, PermAction::View, EntityKind::for_order(k))
            }),
            actor,
            "view orders",
        )?;

        let acts: HashMap<ShardableUuid, Act> = self
            .store
            .list::<Act>()
            .into_iter()
            .map(|act| (act.id.clone(), act))
            .collect();
        let cases: HashMap<ShardableUuid, Case> = self
            .store
            .list::<Case>()
            .into_iter()
            .map(|case| (case.id.clone(), case))
            .collect();

        let mut orders: Vec<Order> = self
            .store
            .list::<Order>()
            .into_iter()
            .filter(|order| kinds.contains(&order.kind()))
            .filter(|order| {
                acts.get(&order.act_id)
                    .and_then(|act| cases.get(&act.case_id).map(|case| (act, case)))
                    .is_some_and(|(act, case)| {
                        has_order_perm(actor, PermAction::View, order, act, case)
                    })
            })
            .collect();
        orders.sort_by_key(|order| order.lifecycle.stamps.created_at);
        Ok(orders)
    }

    pub fn show_order(&self, actor: &Account, order_id: &ShardableUuid) -> HisResult<Order> {
        let (order, act, case) = self.load_with_context(order_id)?;
        ensure(
            has_order_perm(actor, PermAction::View, &order, &act, &case),
            actor,
            "view this order",
        )?;
        Ok(order)
    }
}
