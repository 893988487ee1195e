//! Shared test vocabulary: a small staff-directory domain with hand-written
//! mappings standing in for whatever discovery step a real application would
//! run (a derive, a scanner, a code generator).
#![allow(dead_code)]

use std::any::Any;

use jsonld_bind::{
    Attribute, Entity, Error, LdInstance, MappingRegistry, TypeDescriptor, Value,
};

pub const NS: &str = "http://example.org/vocab#";
pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";

pub fn vocab(local: &str) -> String {
    format!("{NS}{local}")
}

#[derive(Debug, Default)]
pub struct Person {
    pub uri: Option<String>,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub age: Option<i64>,
    pub types: Vec<String>,
}

impl LdInstance for Person {
    fn type_name(&self) -> &str {
        "Person"
    }

    fn get(&self, slot: &str) -> Value {
        match slot {
            "uri" => self.uri.clone().map_or(Value::Null, Value::String),
            "name" => self.name.clone().map_or(Value::Null, Value::String),
            "nickname" => self.nickname.clone().map_or(Value::Null, Value::String),
            "age" => self.age.map_or(Value::Null, Value::Integer),
            "types" => {
                if self.types.is_empty() {
                    Value::Null
                } else {
                    Value::Collection(self.types.iter().cloned().map(Value::String).collect())
                }
            }
            _ => Value::Null,
        }
    }

    fn set(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        match (slot, value) {
            ("uri", Value::String(s)) => self.uri = Some(s),
            ("name", Value::String(s)) => self.name = Some(s),
            ("nickname", Value::String(s)) => self.nickname = Some(s),
            ("age", Value::Integer(i)) => self.age = Some(i),
            ("types", Value::Collection(items)) => {
                self.types = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect();
            }
            (slot, value) => {
                return Err(Error::msg(format!(
                    "Person slot '{slot}' rejects {value:?}"
                )));
            }
        }
        Ok(())
    }

    fn push(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        match (slot, value) {
            ("types", Value::String(s)) => {
                self.types.push(s);
                Ok(())
            }
            (slot, _) => Err(Error::msg(format!("Person slot '{slot}' is not multi-valued"))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Employee {
    pub person: Person,
    pub works_for: Option<Entity>,
}

impl LdInstance for Employee {
    fn type_name(&self) -> &str {
        "Employee"
    }

    fn get(&self, slot: &str) -> Value {
        match slot {
            "worksFor" => self.works_for.clone().map_or(Value::Null, Value::Entity),
            _ => self.person.get(slot),
        }
    }

    fn set(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        match (slot, value) {
            ("worksFor", Value::Entity(e)) => {
                self.works_for = Some(e);
                Ok(())
            }
            (slot, value) => self.person.set(slot, value),
        }
    }

    fn push(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        self.person.push(slot, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Manager {
    pub employee: Employee,
}

impl LdInstance for Manager {
    fn type_name(&self) -> &str {
        "Manager"
    }

    fn get(&self, slot: &str) -> Value {
        self.employee.get(slot)
    }

    fn set(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        self.employee.set(slot, value)
    }

    fn push(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        self.employee.push(slot, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Student {
    pub person: Person,
}

impl LdInstance for Student {
    fn type_name(&self) -> &str {
        "Student"
    }

    fn get(&self, slot: &str) -> Value {
        self.person.get(slot)
    }

    fn set(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        self.person.set(slot, value)
    }

    fn push(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        self.person.push(slot, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Organization {
    pub uri: Option<String>,
    pub name: Option<String>,
    pub established: Option<String>,
    pub departments: Vec<String>,
    pub employees: Vec<Entity>,
    pub partner: Option<Entity>,
    pub properties: Vec<(String, Value)>,
}

impl LdInstance for Organization {
    fn type_name(&self) -> &str {
        "Organization"
    }

    fn get(&self, slot: &str) -> Value {
        match slot {
            "uri" => self.uri.clone().map_or(Value::Null, Value::String),
            "name" => self.name.clone().map_or(Value::Null, Value::String),
            "established" => self.established.clone().map_or(Value::Null, Value::String),
            "departments" => {
                if self.departments.is_empty() {
                    Value::Null
                } else {
                    Value::Collection(
                        self.departments.iter().cloned().map(Value::String).collect(),
                    )
                }
            }
            "hasEmployee" => {
                if self.employees.is_empty() {
                    Value::Null
                } else {
                    Value::Collection(self.employees.iter().cloned().map(Value::Entity).collect())
                }
            }
            "partner" => self.partner.clone().map_or(Value::Null, Value::Entity),
            "properties" => {
                if self.properties.is_empty() {
                    Value::Null
                } else {
                    Value::Bag(self.properties.clone())
                }
            }
            _ => Value::Null,
        }
    }

    fn set(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        match (slot, value) {
            ("uri", Value::String(s)) => self.uri = Some(s),
            ("name", Value::String(s)) => self.name = Some(s),
            ("established", Value::String(s)) => self.established = Some(s),
            ("departments", Value::Collection(items)) => {
                self.departments = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect();
            }
            ("hasEmployee", Value::Collection(items)) => {
                self.employees = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Entity(e) => Some(e),
                        _ => None,
                    })
                    .collect();
            }
            ("partner", Value::Entity(e)) => self.partner = Some(e),
            ("properties", Value::Bag(entries)) => self.properties = entries,
            (slot, value) => {
                return Err(Error::msg(format!(
                    "Organization slot '{slot}' rejects {value:?}"
                )));
            }
        }
        Ok(())
    }

    fn push(&mut self, slot: &str, value: Value) -> Result<(), Error> {
        match (slot, value) {
            ("hasEmployee", Value::Entity(e)) => {
                self.employees.push(e);
                Ok(())
            }
            ("departments", Value::String(s)) => {
                self.departments.push(s);
                Ok(())
            }
            (slot, _) => Err(Error::msg(format!(
                "Organization slot '{slot}' is not multi-valued"
            ))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The registry a discovery step would produce for this domain.
pub fn registry() -> MappingRegistry {
    MappingRegistry::from_types([
        TypeDescriptor::new("Person", vocab("Person"))
            .attribute(Attribute::identifier("uri"))
            .attribute(Attribute::types("types"))
            .attribute(Attribute::data("name", vocab("name")))
            .attribute(Attribute::data("nickname", vocab("nickname")).with_language("en"))
            .attribute(Attribute::data("age", vocab("age")))
            .factory(|| Entity::new(Person::default())),
        TypeDescriptor::new("Employee", vocab("Employee"))
            .with_supertype("Person")
            .attribute(Attribute::reference("worksFor", vocab("worksFor"), "Organization"))
            .factory(|| Entity::new(Employee::default())),
        TypeDescriptor::new("Manager", vocab("Manager"))
            .with_supertype("Employee")
            .factory(|| Entity::new(Manager::default())),
        TypeDescriptor::new("Student", vocab("Student"))
            .with_supertype("Person")
            .factory(|| Entity::new(Student::default())),
        TypeDescriptor::new("Organization", vocab("Organization"))
            .attribute(Attribute::identifier("uri"))
            .attribute(Attribute::data("name", vocab("name")))
            .attribute(Attribute::data("established", vocab("established")).with_datatype(XSD_DATE))
            .attribute(Attribute::data("departments", vocab("department")).ordered())
            .attribute(
                Attribute::reference("hasEmployee", vocab("hasEmployee"), "Employee").multiple(),
            )
            .attribute(Attribute::untyped_reference("partner", vocab("partner")))
            .attribute(Attribute::property_bag("properties"))
            .factory(|| Entity::new(Organization::default())),
    ])
    .expect("the test registry is well-formed")
}
