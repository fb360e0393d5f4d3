//! Mapping from server type codes to labels and file extensions.

/// Label and file extension for one object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTypeInfo {
    pub label: String,
    pub extension: String,
}

pub trait TypeRegistry: Send + Sync {
    fn lookup(&self, type_code: &str) -> Option<ObjectTypeInfo>;

    /// Like `lookup`, but unknown codes come back as their raw code.
    fn resolve(&self, type_code: &str) -> ObjectTypeInfo {
        self.lookup(type_code).unwrap_or_else(|| ObjectTypeInfo {
            label: type_code.to_string(),
            extension: String::new(),
        })
    }
}

/// (type code, label, extension)
const KNOWN_TYPES: &[(&str, &str, &str)] = &[
    ("CLAS/OC", "Class", "clas.abap"),
    ("INTF/OI", "Interface", "intf.abap"),
    ("PROG/P", "Program", "prog.abap"),
    ("PROG/I", "Include", "prog.abap"),
    ("FUGR/F", "Function Group", "fugr.abap"),
    ("FUGR/FF", "Function Module", "func.abap"),
    ("FUGR/I", "Function Group Include", "fugr.abap"),
    ("TABL/DT", "Database Table", "tabl.xml"),
    ("TABL/DS", "Structure", "tabl.xml"),
    ("TTYP/DA", "Table Type", "ttyp.xml"),
    ("DTEL/DE", "Data Element", "dtel.xml"),
    ("DOMA/DD", "Domain", "doma.xml"),
    ("VIEW/DV", "View", "view.xml"),
    ("DDLS/DF", "CDS Data Definition", "ddls.asddls"),
    ("DCLS/DL", "Access Control", "dcls.asdcls"),
    ("BDEF/BDO", "Behavior Definition", "bdef.asbdef"),
    ("SRVD/SRV", "Service Definition", "srvd.srvdsrv"),
    ("MSAG/N", "Message Class", "msag.xml"),
    ("TRAN/T", "Transaction", "tran.xml"),
    ("DEVC/K", "Package", "devc.xml"),
];

/// Registry over a built-in table of common types.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTypeRegistry;

impl TypeRegistry for StaticTypeRegistry {
    fn lookup(&self, type_code: &str) -> Option<ObjectTypeInfo> {
        let code = type_code.trim();
        let exact = KNOWN_TYPES
            .iter()
            .find(|(known, _, _)| known.eq_ignore_ascii_case(code));

        // Fall back to the main type, e.g. "CLAS/OM" -> first "CLAS/..." entry
        let entry = exact.or_else(|| {
            let main = code.split('/').next()?;
            KNOWN_TYPES.iter().find(|(known, _, _)| {
                known
                    .split('/')
                    .next()
                    .is_some_and(|k| k.eq_ignore_ascii_case(main))
            })
        })?;

        Some(ObjectTypeInfo {
            label: entry.1.to_string(),
            extension: entry.2.to_string(),
        })
    }
}
