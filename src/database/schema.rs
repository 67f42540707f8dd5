//! Catalogue of tenant tables: their named unique keys and the child tables
//! that must be empty before a parent row can be deleted.
//!
//! Constraint names match `migrations/0001_init.sql`, so a unique violation
//! reported by Postgres resolves to the same client message as one detected by
//! the in-memory store.

pub struct UniqueKey {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub message: &'static str,
}

pub struct Dependent {
    pub table: &'static str,
    pub column: &'static str,
    pub resource: &'static str,
}

impl Dependent {
    /// Document owners are polymorphic and carry no foreign key; every other
    /// dependent column is a RESTRICT reference.
    pub fn is_foreign_key(&self) -> bool {
        self.column != "ownerId"
    }
}

pub struct TableDef {
    pub name: &'static str,
    pub unique: &'static [UniqueKey],
    pub dependents: &'static [Dependent],
}

pub const TABLES: &[TableDef] = &[
    TableDef {
        name: "levels",
        unique: &[UniqueKey {
            name: "levels_tenant_code_key",
            columns: &["tenantId", "code"],
            message: "A level with this code already exists",
        }],
        dependents: &[Dependent { table: "classes", column: "levelId", resource: "Class" }],
    },
    TableDef {
        name: "classes",
        unique: &[UniqueKey {
            name: "classes_tenant_name_year_key",
            columns: &["tenantId", "name", "academicYear"],
            message: "A class with this name already exists for the academic year",
        }],
        dependents: &[
            Dependent { table: "students", column: "classId", resource: "Student" },
            Dependent { table: "timetable_slots", column: "classId", resource: "TimetableSlot" },
            Dependent { table: "attendance_records", column: "classId", resource: "Attendance" },
        ],
    },
    TableDef {
        name: "students",
        unique: &[UniqueKey {
            name: "students_tenant_number_key",
            columns: &["tenantId", "studentNumber"],
            message: "A student with this student number already exists",
        }],
        dependents: &[
            Dependent { table: "grades", column: "studentId", resource: "Grade" },
            Dependent { table: "attendance_records", column: "studentId", resource: "Attendance" },
            Dependent { table: "documents", column: "ownerId", resource: "Document" },
        ],
    },
    TableDef {
        name: "teachers",
        unique: &[
            UniqueKey {
                name: "teachers_tenant_employee_number_key",
                columns: &["tenantId", "employeeNumber"],
                message: "A teacher with this employee number already exists",
            },
            UniqueKey {
                name: "teachers_tenant_email_key",
                columns: &["tenantId", "email"],
                message: "A teacher with this email already exists",
            },
        ],
        dependents: &[
            Dependent { table: "classes", column: "homeroomTeacherId", resource: "Class" },
            Dependent { table: "timetable_slots", column: "teacherId", resource: "TimetableSlot" },
            Dependent {
                table: "timetable_exceptions",
                column: "substituteTeacherId",
                resource: "TimetableException",
            },
            Dependent { table: "documents", column: "ownerId", resource: "Document" },
        ],
    },
    TableDef {
        name: "subjects",
        unique: &[UniqueKey {
            name: "subjects_tenant_code_key",
            columns: &["tenantId", "code"],
            message: "A subject with this code already exists",
        }],
        dependents: &[
            Dependent { table: "grades", column: "subjectId", resource: "Grade" },
            Dependent { table: "timetable_slots", column: "subjectId", resource: "TimetableSlot" },
        ],
    },
    TableDef {
        name: "rooms",
        unique: &[UniqueKey {
            name: "rooms_tenant_name_key",
            columns: &["tenantId", "name"],
            message: "A room with this name already exists",
        }],
        dependents: &[
            Dependent { table: "timetable_slots", column: "roomId", resource: "TimetableSlot" },
            Dependent { table: "timetable_exceptions", column: "roomId", resource: "TimetableException" },
        ],
    },
    TableDef {
        name: "grades",
        unique: &[],
        dependents: &[],
    },
    TableDef {
        name: "attendance_records",
        unique: &[UniqueKey {
            name: "attendance_tenant_student_date_key",
            columns: &["tenantId", "studentId", "date"],
            message: "Attendance for this student on this date is already recorded",
        }],
        dependents: &[],
    },
    TableDef {
        name: "timetables",
        unique: &[UniqueKey {
            name: "timetables_tenant_name_key",
            columns: &["tenantId", "name"],
            message: "A timetable with this name already exists",
        }],
        dependents: &[Dependent { table: "timetable_slots", column: "timetableId", resource: "TimetableSlot" }],
    },
    TableDef {
        name: "timetable_slots",
        unique: &[],
        dependents: &[Dependent {
            table: "timetable_exceptions",
            column: "slotId",
            resource: "TimetableException",
        }],
    },
    TableDef {
        name: "timetable_exceptions",
        unique: &[UniqueKey {
            name: "timetable_exceptions_slot_date_key",
            columns: &["tenantId", "slotId", "date"],
            message: "An exception for this slot on this date already exists",
        }],
        dependents: &[],
    },
    TableDef {
        name: "messages",
        unique: &[],
        dependents: &[],
    },
    TableDef {
        name: "documents",
        unique: &[],
        dependents: &[],
    },
];

pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}

pub fn unique_key(table_name: &str, constraint: &str) -> Option<&'static UniqueKey> {
    table(table_name)?.unique.iter().find(|k| k.name == constraint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_unique_key_is_tenant_scoped() {
        for table in TABLES {
            for key in table.unique {
                assert_eq!(key.columns.first(), Some(&"tenantId"), "{} is not tenant scoped", key.name);
            }
        }
    }

    #[test]
    fn dependents_point_at_known_tables() {
        for table in TABLES {
            for dep in table.dependents {
                assert!(super::table(dep.table).is_some(), "{} -> {}", table.name, dep.table);
            }
        }
    }

    #[test]
    fn resolves_constraint_messages() {
        let key = unique_key("levels", "levels_tenant_code_key").unwrap();
        assert_eq!(key.columns, &["tenantId", "code"]);
        assert!(unique_key("levels", "nope").is_none());
    }
}
