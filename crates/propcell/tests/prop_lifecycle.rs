//! Lifecycle tests for cells composed into a domain object.
//!
//! Exercises the consumer-facing surface end to end: a `Person` with two
//! independently tracked fields, per-field listeners, audit-stamped edits,
//! and history reconstruction.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use propcell::{Prop, UNSET_TIMESTAMP};
use uuid::Uuid;

struct Person {
    name: Prop<String>,
    age: Prop<u32>,
}

impl Person {
    fn new() -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Self>| {
            let owner: Weak<dyn Any> = weak.clone();
            Self {
                name: Prop::builder().owner(owner.clone()).build(),
                age: Prop::builder().owner(owner).build(),
            }
        })
    }

    fn with(name: &str, age: u32) -> Rc<Self> {
        let person = Self::new();
        person.name.set(name.to_string());
        person.age.set(age);
        person
    }
}

/// Listener state captured per field, mirroring what a binding layer keeps.
struct Recorded<T> {
    count: Cell<usize>,
    previous: RefCell<Option<T>>,
    current: RefCell<Option<T>>,
}

fn record<T: Clone + 'static>(prop: &Prop<T>) -> (propcell::ListenerHandle, Rc<Recorded<T>>) {
    let state = Rc::new(Recorded {
        count: Cell::new(0),
        previous: RefCell::new(None),
        current: RefCell::new(None),
    });
    let state_clone = Rc::clone(&state);
    let handle = prop.add_listener(move |event| {
        state_clone.count.set(state_clone.count.get() + 1);
        *state_clone.previous.borrow_mut() = event.previous_value().cloned();
        *state_clone.current.borrow_mut() = event.value().cloned();
    });
    (handle, state)
}

#[test]
fn getters_and_setters() {
    let thomas = Person::new();
    assert!(!thomas.name.is_set());
    assert!(!thomas.age.is_set());
    assert_eq!(thomas.name.last_modified(), UNSET_TIMESTAMP);
    assert_eq!(thomas.age.last_modified(), UNSET_TIMESTAMP);

    thomas.name.set("Thomas".to_string());
    thomas.age.set(36);

    assert!(thomas.name.is_set());
    assert!(thomas.age.is_set());
    assert_ne!(thomas.name.last_modified(), UNSET_TIMESTAMP);
    assert_ne!(thomas.age.last_modified(), UNSET_TIMESTAMP);

    let aj = Person::with("AJ", 32);
    assert!(aj.name.is_set());
    assert!(aj.age.is_set());

    assert_eq!(thomas.name.get().as_deref(), Some("Thomas"));
    assert_eq!(aj.name.get().as_deref(), Some("AJ"));
    assert_eq!(thomas.age.get(), Some(36));
    assert_eq!(aj.age.get(), Some(32));
}

#[test]
fn per_field_listeners() {
    let thomas = Person::with("Thomas", 36);
    let (name_handle, name) = record(&thomas.name);
    let (_age_handle, age) = record(&thomas.age);

    thomas.name.set("Grand Lord Hellbringer".to_string());
    assert_eq!(name.count.get(), 1);
    assert_eq!(name.previous.borrow().as_deref(), Some("Thomas"));
    assert_eq!(name.current.borrow().as_deref(), Some("Grand Lord Hellbringer"));

    thomas.name.set("Master of the Creeping Darkness".to_string());
    assert_eq!(name.count.get(), 2);
    assert_eq!(
        name.previous.borrow().as_deref(),
        Some("Grand Lord Hellbringer")
    );
    assert_eq!(
        name.current.borrow().as_deref(),
        Some("Master of the Creeping Darkness")
    );

    // Removing the name listener silences the name field only.
    assert!(thomas.name.remove_listener(name_handle));
    thomas.name.set("You should not see this".to_string());
    assert_eq!(name.count.get(), 2);

    thomas.age.set(437);
    assert_eq!(age.count.get(), 1);
    assert_eq!(*age.previous.borrow(), Some(36));
    assert_eq!(*age.current.borrow(), Some(437));

    thomas.age.set(12);
    assert_eq!(age.count.get(), 2);
    assert_eq!(*age.previous.borrow(), Some(437));
    assert_eq!(*age.current.borrow(), Some(12));

    thomas.age.remove_all_listeners();
    thomas.age.set(632);
    assert_eq!(age.count.get(), 2);
    assert_eq!(*age.current.borrow(), Some(12));
}

#[test]
fn versioning() {
    let thomas = Person::with("Thomas", 36);

    thomas.name.set("Grand Lord Hellbringer".to_string());
    thomas.name.set("Master of the Creeping Darkness".to_string());
    thomas
        .name
        .set("Fell Marshall of the Undying Hordes".to_string());

    let names = thomas.name.history().expect("name history enabled");
    let values: Vec<_> = names.iter().map(|v| v.value().cloned()).collect();
    assert_eq!(
        values,
        vec![
            Some("Thomas".to_string()),
            Some("Grand Lord Hellbringer".to_string()),
            Some("Master of the Creeping Darkness".to_string()),
        ]
    );
    assert_eq!(
        thomas.name.get().as_deref(),
        Some("Fell Marshall of the Undying Hordes")
    );

    thomas.age.set(437);
    thomas.age.set(12);
    thomas.age.set(0);

    let ages = thomas.age.history().expect("age history enabled");
    let values: Vec<_> = ages.iter().map(|v| v.value().copied()).collect();
    assert_eq!(values, vec![Some(36), Some(437), Some(12)]);
}

#[test]
fn versioning_with_audit_metadata() {
    let thomas = Person::with("Thomas", 36);

    let user1 = Uuid::new_v4().to_string();
    thomas
        .name
        .set_audited("Grand Lord Hellbringer".to_string(), &user1, 1_451_606_400_000);

    let user2 = Uuid::new_v4().to_string();
    thomas.name.set_audited(
        "Master of the Creeping Darkness".to_string(),
        &user2,
        1_451_692_800_000,
    );

    let user3 = Uuid::new_v4().to_string();
    thomas.name.set_audited(
        "Fell Marshall of the Undying Hordes".to_string(),
        &user3,
        1_451_779_200_000,
    );

    let names = thomas.name.history().expect("name history enabled");
    assert_eq!(names.len(), 3);

    // Entry 0 is the plain-`set` seed: no author, wall-clock stamp.
    assert_eq!(names[0].value().map(String::as_str), Some("Thomas"));
    assert_eq!(names[0].author(), None);

    // Each later entry carries the metadata supplied when its value was
    // stored, not when it was displaced.
    assert_eq!(names[1].author(), Some(user1.as_str()));
    assert_eq!(names[1].timestamp(), 1_451_606_400_000);
    assert_eq!(names[2].author(), Some(user2.as_str()));
    assert_eq!(names[2].timestamp(), 1_451_692_800_000);

    assert_eq!(thomas.name.last_modified_by(), Some(user3));
    assert_eq!(thomas.name.last_modified(), 1_451_779_200_000);
}

#[test]
fn owner_back_reference_resolves_to_the_composing_object() {
    let person = Person::new();

    let owner = person.name.owner().expect("owner attached at construction");
    let upgraded = owner.upgrade().expect("person still alive");
    let recovered = upgraded
        .downcast::<Person>()
        .expect("owner is the Person that built the cell");
    assert!(Rc::ptr_eq(&person, &recovered));

    // The back-reference is non-owning: dropping the person leaves the cell
    // usable with a dead owner handle.
    let name = person.name.clone();
    drop((person, recovered));
    assert!(name.owner().expect("still attached").upgrade().is_none());
    name.set("orphaned".to_string());
    assert_eq!(name.get().as_deref(), Some("orphaned"));
}
