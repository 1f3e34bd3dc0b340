//! Shared test fixtures: a scripted in-memory driver plus sample entities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use relq_core::{
    Connection, Driver, Entity, EntityDescriptor, Error, ParameterCollection, PropertyDescriptor,
    QueryOutput, RowCursor, RowTarget, ScalarType, Value,
};

/// One canned response for the next statement of its kind.
pub enum Response {
    /// A result set plus output-parameter values.
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
        outputs: Vec<(String, Value)>,
    },
    /// A scalar result.
    Scalar(Value),
    /// A rows-affected count.
    Affected(u64),
}

/// A recorded statement.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<(String, Value)>,
    pub in_transaction: bool,
}

/// Transaction lifecycle events, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEvent {
    Begin,
    Commit,
    Rollback,
}

#[derive(Default)]
struct DriverState {
    responses: Mutex<VecDeque<Response>>,
    statements: Mutex<Vec<Statement>>,
    events: Mutex<Vec<TxEvent>>,
    fail_at_statement: Mutex<Option<usize>>,
}

/// A scripted driver: statements are recorded, responses are served from a
/// queue, and a chosen statement index can be made to fail.
#[derive(Clone, Default)]
pub struct ScriptedDriver {
    state: Arc<DriverState>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        self.push_rows_with_outputs(columns, rows, Vec::new());
    }

    pub fn push_rows_with_outputs(
        &self,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
        outputs: Vec<(String, Value)>,
    ) {
        self.push(Response::Rows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            outputs,
        });
    }

    pub fn push_scalar(&self, value: Value) {
        self.push(Response::Scalar(value));
    }

    pub fn push_affected(&self, count: u64) {
        self.push(Response::Affected(count));
    }

    /// Fail the `n`th statement (1-based, counting every execute/scalar/
    /// query on any connection).
    pub fn fail_at_statement(&self, n: usize) {
        *self.state.fail_at_statement.lock().unwrap() = Some(n);
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.state.statements.lock().unwrap().clone()
    }

    pub fn last_statement(&self) -> Statement {
        self.statements().last().cloned().expect("no statement recorded")
    }

    pub fn events(&self) -> Vec<TxEvent> {
        self.state.events.lock().unwrap().clone()
    }

    fn push(&self, response: Response) {
        self.state.responses.lock().unwrap().push_back(response);
    }
}

impl Driver for ScriptedDriver {
    type Connection = ScriptedConnection;

    fn connect(&self) -> Result<Self::Connection, Error> {
        Ok(ScriptedConnection {
            state: self.state.clone(),
            in_transaction: false,
        })
    }
}

pub struct ScriptedConnection {
    state: Arc<DriverState>,
    in_transaction: bool,
}

impl ScriptedConnection {
    fn record(&self, sql: &str, params: &ParameterCollection) -> Result<(), Error> {
        let mut statements = self.state.statements.lock().unwrap();
        statements.push(Statement {
            sql: sql.to_string(),
            params: params
                .iter()
                .map(|p| (p.name.clone(), p.value.clone()))
                .collect(),
            in_transaction: self.in_transaction,
        });

        let position = statements.len();
        if *self.state.fail_at_statement.lock().unwrap() == Some(position) {
            return Err(Error::Database("scripted failure".to_string()));
        }
        Ok(())
    }

    fn next_response(&self) -> Option<Response> {
        self.state.responses.lock().unwrap().pop_front()
    }
}

impl Connection for ScriptedConnection {
    type Rows = VecRows;

    fn execute(&mut self, sql: &str, params: &ParameterCollection) -> Result<u64, Error> {
        self.record(sql, params)?;
        match self.next_response() {
            Some(Response::Affected(count)) => Ok(count),
            Some(_) => Err(Error::Database("script expected an execute".into())),
            None => Ok(1),
        }
    }

    fn query_scalar(&mut self, sql: &str, params: &ParameterCollection) -> Result<Value, Error> {
        self.record(sql, params)?;
        match self.next_response() {
            Some(Response::Scalar(value)) => Ok(value),
            Some(_) => Err(Error::Database("script expected a scalar".into())),
            None => Ok(Value::Null),
        }
    }

    fn query(
        &mut self,
        sql: &str,
        params: &ParameterCollection,
    ) -> Result<QueryOutput<VecRows>, Error> {
        self.record(sql, params)?;
        match self.next_response() {
            Some(Response::Rows {
                columns,
                rows,
                outputs,
            }) => Ok(QueryOutput {
                rows: VecRows {
                    columns,
                    rows,
                    position: None,
                },
                outputs,
            }),
            _ => Err(Error::Database("script has no rows queued".into())),
        }
    }

    fn begin(&mut self) -> Result<(), Error> {
        self.in_transaction = true;
        self.state.events.lock().unwrap().push(TxEvent::Begin);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.in_transaction = false;
        self.state.events.lock().unwrap().push(TxEvent::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Error> {
        self.in_transaction = false;
        self.state.events.lock().unwrap().push(TxEvent::Rollback);
        Ok(())
    }
}

/// A forward-only cursor over scripted rows.
pub struct VecRows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
}

impl RowCursor for VecRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool, Error> {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn value(&self, ordinal: usize) -> Result<Value, Error> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| Error::Database("cursor is not positioned on a row".into()))?;
        row.get(ordinal)
            .cloned()
            .ok_or_else(|| Error::Database(format!("no column at ordinal {ordinal}")))
    }
}

// --- Sample entities ------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
pub struct School {
    pub id: i64,
    pub school_name: String,
}

impl RowTarget for School {
    fn assign(&mut self, member: &str, value: Value) {
        match member {
            "Id" => self.id = value.as_i64().unwrap_or_default(),
            "SchoolName" => self.school_name = value.as_str().unwrap_or_default().to_string(),
            _ => {}
        }
    }
}

impl Entity for School {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("School")
            .with_property(PropertyDescriptor::key("Id", ScalarType::Int64))
            .with_property(PropertyDescriptor::new("SchoolName", ScalarType::String))
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn assign_key(&mut self, key: i64) {
        self.id = key;
    }

    fn read(&self, member: &str) -> Value {
        match member {
            "Id" => Value::Int64(self.id),
            "SchoolName" => Value::String(self.school_name.clone()),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub is_active: bool,
    pub nickname: Option<String>,
    pub school_id: i64,
    pub school: Option<School>,
}

impl RowTarget for Student {
    fn assign(&mut self, member: &str, value: Value) {
        match member {
            "Id" => self.id = value.as_i64().unwrap_or_default(),
            "Name" => self.name = value.as_str().unwrap_or_default().to_string(),
            "Age" => self.age = value.as_i32().unwrap_or_default(),
            "IsActive" => self.is_active = value.as_bool().unwrap_or_default(),
            "Nickname" => self.nickname = value.as_str().map(str::to_string),
            "SchoolId" => self.school_id = value.as_i64().unwrap_or_default(),
            _ => {}
        }
    }
}

impl Entity for Student {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Student")
            .with_property(PropertyDescriptor::key("Id", ScalarType::Int64))
            .with_property(PropertyDescriptor::new("Name", ScalarType::String))
            .with_property(PropertyDescriptor::new("Age", ScalarType::Int32))
            .with_property(PropertyDescriptor::new("IsActive", ScalarType::Bool))
            .with_property(PropertyDescriptor::optional("Nickname", ScalarType::String))
            .with_property(PropertyDescriptor::new("SchoolId", ScalarType::Int64))
            .with_property(PropertyDescriptor::navigation::<School>("School", "SchoolId"))
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn assign_key(&mut self, key: i64) {
        self.id = key;
    }

    fn read(&self, member: &str) -> Value {
        match member {
            "Id" => Value::Int64(self.id),
            "Name" => Value::String(self.name.clone()),
            "Age" => Value::Int32(self.age),
            "IsActive" => Value::Bool(self.is_active),
            "Nickname" => Value::from(self.nickname.clone()),
            "SchoolId" => Value::Int64(self.school_id),
            _ => Value::Null,
        }
    }

    fn hydrate_navigation(&mut self, member: &str, fill: &mut dyn FnMut(&mut dyn RowTarget)) {
        if member == "School" {
            let mut school = School::default();
            fill(&mut school);
            self.school = Some(school);
        }
    }
}

/// A soft-delete entity.
#[derive(Debug, Default, Clone)]
pub struct Note {
    pub id: i64,
    pub body: String,
}

impl RowTarget for Note {
    fn assign(&mut self, member: &str, value: Value) {
        match member {
            "Id" => self.id = value.as_i64().unwrap_or_default(),
            "Body" => self.body = value.as_str().unwrap_or_default().to_string(),
            _ => {}
        }
    }
}

impl Entity for Note {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Note")
            .with_property(PropertyDescriptor::key("Id", ScalarType::Int64))
            .with_property(PropertyDescriptor::new("Body", ScalarType::String))
            .with_soft_delete()
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn assign_key(&mut self, key: i64) {
        self.id = key;
    }

    fn read(&self, member: &str) -> Value {
        match member {
            "Id" => Value::Int64(self.id),
            "Body" => Value::String(self.body.clone()),
            _ => Value::Null,
        }
    }
}

/// A projection target.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StudentDto {
    pub student_name: String,
    pub school_name: String,
}

impl RowTarget for StudentDto {
    fn assign(&mut self, member: &str, value: Value) {
        match member {
            "StudentName" => self.student_name = value.as_str().unwrap_or_default().to_string(),
            "SchoolName" => self.school_name = value.as_str().unwrap_or_default().to_string(),
            _ => {}
        }
    }
}
