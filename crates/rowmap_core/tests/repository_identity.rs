use rowmap_core::{
    Connective, EntityDefinition, EntityRegistry, Gateway, GatewayError, GatewayResult,
    OrmError, PropertySpec, QueryParams, Record, ValidationRule, Value, WhereClause,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(QueryParams),
    LastInsertId,
    Read(QueryParams),
    Update(QueryParams),
    Delete(QueryParams),
}

/// In-memory gateway that records every request it receives.
#[derive(Default)]
struct RecordingGateway {
    calls: RefCell<Vec<Call>>,
    rows: RefCell<BTreeMap<i64, Record>>,
    next_id: Cell<i64>,
    last_id: Cell<i64>,
    refuse_create: Cell<bool>,
    fail_reads: Cell<bool>,
}

impl RecordingGateway {
    fn seed(&self, id: i64, first_name: &str) {
        let mut row = Record::new();
        row.insert("id".to_string(), Value::Integer(id));
        row.insert("first_name".to_string(), Value::from(first_name));
        self.rows.borrow_mut().insert(id, row);
    }

    fn take_calls(&self) -> Vec<Call> {
        self.calls.borrow_mut().drain(..).collect()
    }

    fn reads(&self) -> Vec<QueryParams> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Read(params) => Some(params.clone()),
                _ => None,
            })
            .collect()
    }
}

fn matches(row: &Record, clauses: &[WhereClause]) -> bool {
    clauses.is_empty()
        || clauses
            .iter()
            .any(|clause| row.get(&clause.column) == Some(&clause.value))
}

impl Gateway for RecordingGateway {
    fn connect(&self, _database: &str) -> GatewayResult<()> {
        Ok(())
    }

    fn disconnect(&self, _database: &str) -> GatewayResult<()> {
        Ok(())
    }

    fn last_insert_id(&self, _sequence: Option<&str>, _database: &str) -> GatewayResult<i64> {
        self.calls.borrow_mut().push(Call::LastInsertId);
        Ok(self.last_id.get())
    }

    fn create(&self, params: &QueryParams) -> GatewayResult<bool> {
        self.calls.borrow_mut().push(Call::Create(params.clone()));
        if self.refuse_create.get() {
            return Ok(false);
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.last_id.set(id);
        let mut row = params.data.clone();
        row.insert("id".to_string(), Value::Integer(id));
        self.rows.borrow_mut().insert(id, row);
        Ok(true)
    }

    fn read(&self, params: &QueryParams) -> GatewayResult<Vec<Record>> {
        self.calls.borrow_mut().push(Call::Read(params.clone()));
        if self.fail_reads.get() {
            return Err(GatewayError::InvalidRequest("reads disabled".to_string()));
        }
        Ok(self
            .rows
            .borrow()
            .values()
            .filter(|row| matches(row, &params.where_clauses))
            .cloned()
            .collect())
    }

    fn update(&self, params: &QueryParams) -> GatewayResult<bool> {
        self.calls.borrow_mut().push(Call::Update(params.clone()));
        let mut changed = false;
        for row in self.rows.borrow_mut().values_mut() {
            if matches(row, &params.where_clauses) {
                row.extend(params.data.clone());
                changed = true;
            }
        }
        Ok(changed)
    }

    fn delete(&self, params: &QueryParams) -> GatewayResult<bool> {
        self.calls.borrow_mut().push(Call::Delete(params.clone()));
        let mut rows = self.rows.borrow_mut();
        let before = rows.len();
        rows.retain(|_, row| !matches(row, &params.where_clauses));
        Ok(rows.len() != before)
    }
}

fn user_registry(gateway: &Rc<RecordingGateway>) -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    registry
        .register(
            EntityDefinition::new("user")
                .property("id", PropertySpec::new("users", "id"))
                .property(
                    "firstName",
                    PropertySpec::new("users", "first_name")
                        .with_rule(ValidationRule::non_empty_text()),
                ),
            gateway.clone(),
        )
        .expect("user entity should register");
    registry
}

fn first_name(data: &str) -> Record {
    let mut record = Record::new();
    record.insert("firstName".to_string(), Value::from(data));
    record
}

#[test]
fn repeated_get_by_id_returns_the_same_instance() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.seed(5, "Ada");
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();

    let first = repo.get_by_id(5).unwrap().expect("row 5 exists");
    let second = repo.get_by_id(5).unwrap().expect("row 5 is cached");
    assert!(first.same_instance(&second));
    assert_eq!(gateway.reads().len(), 1);

    first.set("firstName", "Grace").unwrap();
    assert_eq!(second.get("firstName").unwrap(), Value::from("Grace"));
}

#[test]
fn get_by_id_for_missing_row_returns_none() {
    let gateway = Rc::new(RecordingGateway::default());
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();

    assert!(repo.get_by_id(42).unwrap().is_none());
    assert_eq!(repo.cache_len(), 0);
    assert_eq!(
        gateway.reads()[0].where_clauses,
        vec![WhereClause::eq("id", 42)]
    );
    assert_eq!(gateway.reads()[0].table, "users");
}

#[test]
fn adding_transient_model_creates_then_rereads_by_new_id() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.next_id.set(11);
    let registry = user_registry(&gateway);
    let entity = registry.get("user").unwrap();

    let model = rowmap_core::ModelHandle::new(entity.factory().create(&first_name("Ada")));
    assert!(model.borrow().is_transient());

    let id = entity.repository().add(&model).unwrap();
    assert_eq!(id, Some(12));
    assert_eq!(model.id(), Some(12));
    assert_eq!(model.get("firstName").unwrap(), Value::from("Ada"));

    let calls = gateway.take_calls();
    assert_eq!(calls.len(), 3);
    match &calls[0] {
        Call::Create(params) => {
            let mut expected = Record::new();
            expected.insert("first_name".to_string(), Value::from("Ada"));
            assert_eq!(params.data, expected);
            assert_eq!(params.table, "users");
        }
        other => panic!("expected create, got {other:?}"),
    }
    assert_eq!(calls[1], Call::LastInsertId);
    match &calls[2] {
        Call::Read(params) => assert_eq!(params.where_clauses, vec![WhereClause::eq("id", 12)]),
        other => panic!("expected read, got {other:?}"),
    }

    let cached = entity.repository().cached(12).expect("model is cached");
    assert!(cached.same_instance(&model));
}

#[test]
fn adding_persisted_model_updates_by_id_without_create() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.seed(7, "Ada");
    let registry = user_registry(&gateway);
    let entity = registry.get("user").unwrap();

    let model = rowmap_core::ModelHandle::new(entity.factory().create_empty());
    model.set("id", 7).unwrap();
    model.set("firstName", "Grace").unwrap();

    assert_eq!(entity.repository().add(&model).unwrap(), Some(7));

    let calls = gateway.take_calls();
    assert!(!calls.iter().any(|call| matches!(call, Call::Create(_))));
    match calls.as_slice() {
        [Call::Update(params)] => {
            assert_eq!(params.where_clauses, vec![WhereClause::eq("id", 7)]);
            assert_eq!(params.data.get("first_name"), Some(&Value::from("Grace")));
            assert_eq!(params.data.get("id"), Some(&Value::Integer(7)));
        }
        other => panic!("expected one update, got {other:?}"),
    }
    assert!(entity.repository().cached(7).unwrap().same_instance(&model));
}

#[test]
fn adding_model_with_non_integer_id_updates_instead_of_creating() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.seed(1, "Ada");
    let registry = user_registry(&gateway);
    let entity = registry.get("user").unwrap();
    let repo = entity.repository();

    let real_id = rowmap_core::ModelHandle::new(entity.factory().create(&first_name("Grace")));
    real_id.set("id", Value::Real(1.0)).unwrap();
    assert_eq!(repo.add(&real_id).unwrap(), Some(1));

    let text_id = rowmap_core::ModelHandle::new(entity.factory().create(&first_name("Joan")));
    text_id.set("id", "abc").unwrap();
    assert_eq!(repo.add(&text_id).unwrap(), None);

    let calls = gateway.take_calls();
    match calls.as_slice() {
        [Call::Update(first), Call::Update(second)] => {
            assert_eq!(first.where_clauses, vec![WhereClause::eq("id", 1)]);
            assert_eq!(second.where_clauses, vec![WhereClause::eq("id", "abc")]);
        }
        other => panic!("expected two updates, got {other:?}"),
    }
    assert_eq!(
        gateway.rows.borrow()[&1].get("first_name"),
        Some(&Value::from("Grace"))
    );
    assert!(repo.cached(1).unwrap().same_instance(&real_id));
    assert_eq!(repo.cached_ids(), vec![1]);
}

#[test]
fn delete_evicts_and_forces_a_fresh_read() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.seed(7, "Ada");
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();

    let before = repo.get_by_id(7).unwrap().unwrap();
    assert!(repo.delete(7).unwrap());
    assert!(repo.cached(7).is_none());
    assert!(!repo.delete(7).unwrap());

    gateway.seed(7, "Ada");
    gateway.take_calls();
    let after = repo.get_by_id(7).unwrap().unwrap();
    assert!(!after.same_instance(&before));
    assert_eq!(gateway.reads().len(), 1);
}

#[test]
fn query_short_circuits_cached_ids() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.seed(3, "Ada");
    gateway.seed(9, "Grace");
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();

    let cached = repo.get_by_id(3).unwrap().unwrap();
    gateway.take_calls();

    let models = repo
        .get(
            QueryParams::new()
                .filter(WhereClause::eq("id", 3))
                .filter(WhereClause::eq("id", 9).with_condition(Connective::Or)),
        )
        .unwrap();

    assert_eq!(models.keys().copied().collect::<Vec<_>>(), vec![3, 9]);
    assert!(models[&3].same_instance(&cached));
    assert_eq!(models[&9].get("firstName").unwrap(), Value::from("Grace"));

    let reads = gateway.reads();
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0].where_clauses, vec![WhereClause::eq("id", 9)]);
}

#[test]
fn query_keeps_caller_order_and_connectives_after_first_clause() {
    let gateway = Rc::new(RecordingGateway::default());
    for (id, name) in [(1, "A"), (2, "B"), (4, "D")] {
        gateway.seed(id, name);
    }
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();
    repo.get_by_id(1).unwrap();
    gateway.take_calls();

    repo.get(
        QueryParams::new()
            .filter(WhereClause::eq("id", 1))
            .filter(WhereClause::eq("id", 4).with_condition(Connective::Or))
            .filter(WhereClause::eq("first_name", "B").with_condition(Connective::And))
            .filter(WhereClause::eq("id", 2).with_condition(Connective::Or)),
    )
    .unwrap();

    let reads = gateway.reads();
    assert_eq!(
        reads[0].where_clauses,
        vec![
            WhereClause::eq("id", 4),
            WhereClause::eq("id", 2).with_condition(Connective::Or),
        ]
    );
}

#[test]
fn query_resolved_entirely_from_cache_skips_storage() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.seed(3, "Ada");
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();
    repo.get_by_id(3).unwrap();
    gateway.take_calls();

    let models = repo
        .get(
            QueryParams::new()
                .filter(WhereClause::eq("first_name", "Ada"))
                .filter(WhereClause::eq("id", 3)),
        )
        .unwrap();

    assert_eq!(models.len(), 1);
    assert!(gateway.take_calls().is_empty());
}

#[test]
fn query_with_only_non_id_clauses_skips_storage() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.seed(3, "Ada");
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();

    let models = repo
        .get(
            QueryParams::new()
                .filter(WhereClause::eq("first_name", "Ada"))
                .filter(WhereClause::eq("first_name", "Grace").with_condition(Connective::Or)),
        )
        .unwrap();

    assert!(models.is_empty());
    assert!(gateway.take_calls().is_empty());
    assert_eq!(repo.cache_len(), 0);
}

#[test]
fn stored_rows_for_cached_ids_resolve_to_cached_instances() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.seed(3, "Ada");
    gateway.seed(4, "Grace");
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();

    let cached = repo.get_by_id(3).unwrap().unwrap();
    cached.set("firstName", "Local edit").unwrap();

    let all = repo.get(QueryParams::new()).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[&3].same_instance(&cached));
    assert_eq!(all[&3].get("firstName").unwrap(), Value::from("Local edit"));
    assert_eq!(repo.cached_ids(), vec![3, 4]);
}

#[test]
fn refused_create_leaves_model_transient_and_uncached() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.refuse_create.set(true);
    let registry = user_registry(&gateway);
    let entity = registry.get("user").unwrap();

    let model = rowmap_core::ModelHandle::new(entity.factory().create(&first_name("Ada")));
    assert_eq!(entity.repository().add(&model).unwrap(), None);
    assert!(model.borrow().is_transient());
    assert_eq!(entity.repository().cache_len(), 0);
    assert!(gateway.reads().is_empty());
}

#[test]
fn gateway_errors_propagate_unchanged() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.fail_reads.set(true);
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();

    match repo.get_by_id(1) {
        Err(OrmError::Gateway(GatewayError::InvalidRequest(message))) => {
            assert_eq!(message, "reads disabled");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn evict_and_clear_cache_leave_storage_untouched() {
    let gateway = Rc::new(RecordingGateway::default());
    gateway.seed(1, "Ada");
    gateway.seed(2, "Grace");
    let registry = user_registry(&gateway);
    let repo = registry.repository("user").unwrap();
    repo.get(QueryParams::new()).unwrap();
    gateway.take_calls();

    assert!(repo.evict(1).is_some());
    assert_eq!(repo.cached_ids(), vec![2]);
    repo.clear_cache();
    assert_eq!(repo.cache_len(), 0);
    assert!(gateway.take_calls().is_empty());
    assert_eq!(gateway.rows.borrow().len(), 2);
}
