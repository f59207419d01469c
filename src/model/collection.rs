use serde::{Deserialize, Serialize};

use crate::model::Document;

/// The document collections backing each resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Rooms,
    Users,
    Reviews,
    Bookings,
}

/// How a relation finds the documents it expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The local attribute holds the `_id` of one target document.
    Reference { local_field: &'static str },
    /// Target documents whose attribute holds this document's `_id`.
    Inverse { foreign_field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub target: Collection,
    pub kind: RelationKind,
}

const ROOM_RELATIONS: &[RelationDef] = &[RelationDef {
    name: "reviews",
    target: Collection::Reviews,
    kind: RelationKind::Inverse {
        foreign_field: "room",
    },
}];

const USER_RELATIONS: &[RelationDef] = &[
    RelationDef {
        name: "bookings",
        target: Collection::Bookings,
        kind: RelationKind::Inverse {
            foreign_field: "user",
        },
    },
    RelationDef {
        name: "reviews",
        target: Collection::Reviews,
        kind: RelationKind::Inverse {
            foreign_field: "user",
        },
    },
];

const REVIEW_RELATIONS: &[RelationDef] = &[
    RelationDef {
        name: "room",
        target: Collection::Rooms,
        kind: RelationKind::Reference { local_field: "room" },
    },
    RelationDef {
        name: "user",
        target: Collection::Users,
        kind: RelationKind::Reference { local_field: "user" },
    },
];

const BOOKING_RELATIONS: &[RelationDef] = &[
    RelationDef {
        name: "room",
        target: Collection::Rooms,
        kind: RelationKind::Reference { local_field: "room" },
    },
    RelationDef {
        name: "user",
        target: Collection::Users,
        kind: RelationKind::Reference { local_field: "user" },
    },
];

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Rooms,
        Collection::Users,
        Collection::Reviews,
        Collection::Bookings,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Rooms => "rooms",
            Collection::Users => "users",
            Collection::Reviews => "reviews",
            Collection::Bookings => "bookings",
        }
    }

    pub fn relations(&self) -> &'static [RelationDef] {
        match self {
            Collection::Rooms => ROOM_RELATIONS,
            Collection::Users => USER_RELATIONS,
            Collection::Reviews => REVIEW_RELATIONS,
            Collection::Bookings => BOOKING_RELATIONS,
        }
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relations().iter().find(|relation| relation.name == name)
    }

    /// Attributes never returned from a read.
    pub fn hidden_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Users => &[
                "password",
                "passwordChangedAt",
                "passwordResetToken",
                "passwordResetTokenExpiry",
            ],
            _ => &[],
        }
    }

    /// Attributes whose values must be unique across the collection.
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Rooms => &["name"],
            _ => &[],
        }
    }

    pub fn redact(&self, mut document: Document) -> Document {
        for field in self.hidden_fields() {
            document.remove(*field);
        }
        document
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
