//! Integration tests for template processing
//!
//! Loads a calls database, enriches it and expands C and Fortran templates
//! on disk.

use std::fs;

use mpigen_generation::{
    parse_database, Enricher, GeneratorConfig, StandardVersion, TemplateError, TemplateProcessor,
};

const DATABASE: &str = r#"{
    "mpi_calls": [
        "Environmental management",
        {
            "name": "MPI_Comm_rank",
            "cpar": "MPI_Comm comm, int *rank",
            "f08par": "TYPE(MPI_Comm), INTENT(IN) :: comm; INTEGER, INTENT(OUT) :: rank; INTEGER, OPTIONAL, INTENT(OUT) :: ierror",
            "tags": "comm",
            "since": "1.0"
        },
        "Point-to-point",
        {
            "name": "MPI_Send",
            "cpar": "MPI3_CONST void *buf, int count, MPI_Datatype datatype, int dest, int tag, MPI_Comm comm",
            "tags": ["p2p", "blocking"]
        },
        {
            "name": "MPI_Isendrecv",
            "cpar": "void",
            "tags": "p2p",
            "since": "4.0"
        },
        {
            "name": "MPI_Mprobe",
            "cpar": "void",
            "tags": "p2p",
            "broken_in": {"Open MPI": ["4\\.1"]}
        }
    ]
}"#;

fn config(standard: StandardVersion) -> GeneratorConfig {
    GeneratorConfig {
        target_standard: standard,
        library_version: Some("Open MPI v4.1.5, package: Open MPI".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_c_template_end_to_end() {
    let records = parse_database(DATABASE).unwrap();
    let calls = Enricher::from_config(&config(StandardVersion::new(3, 1)))
        .enrich(&records);

    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("p2p.c.in");
    let output = dir.path().join("p2p.c");
    fs::write(
        &template,
        "#include <mpi.h>\n\
         #pragma pygen start where(\"p2p\" in tags)\n\
         int {MPI_NAME}({C_PARAMS}) {{ return P{MPI_NAME}({C_ARG_LIST}); }}\n\
         #pragma pygen end\n",
    )
    .unwrap();

    let summary = TemplateProcessor::new(&calls).process(&template, &output).unwrap();
    assert_eq!(summary.regions, 1);
    assert_eq!(summary.expansions, 1);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "#include <mpi.h>\n\
         int MPI_Send(const void *buf, int count, MPI_Datatype datatype, int dest, int tag, MPI_Comm comm) \
         { return PMPI_Send(buf, count, datatype, dest, tag, comm); }\n"
    );
}

#[test]
fn test_const_macro_removed_for_old_standard() {
    let records = parse_database(DATABASE).unwrap();
    let calls = Enricher::new(StandardVersion::new(2, 2)).enrich(&records);
    let output = TemplateProcessor::new(&calls)
        .process_str(
            mpigen_generation::TemplateFamily::C,
            "#pragma pygen start exclude(MPI_Comm)\n{c_params}\n#pragma pygen end\n",
        )
        .unwrap();
    assert_eq!(
        output,
        "void *buf, int count, MPI_Datatype datatype, int dest, int tag, MPI_Comm comm\nvoid\n"
    );
}

#[test]
fn test_fortran_template_end_to_end() {
    let records = parse_database(DATABASE).unwrap();
    let calls = Enricher::from_config(&config(StandardVersion::new(4, 0)))
        .enrich(&records);

    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("bindings.F90.in");
    let output = dir.path().join("bindings.F90");
    fs::write(
        &template,
        "module bindings\n\
         !$PYGEN start where(has_f08)\n\
         subroutine {mpi_lcase}_f08({f08_arg_list})\n\
         \x20   {f08_decls}\n\
         \x20   call {mpi_lcase}_c({f08_c_arg_list})\n\
         end subroutine\n\
         !$PYGEN end\n\
         end module\n",
    )
    .unwrap();

    let summary = TemplateProcessor::new(&calls).process(&template, &output).unwrap();
    assert_eq!(summary.expansions, 1);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "module bindings\n\
         subroutine mpi_comm_rank_f08(comm, rank, ierror)\n\
         \x20   TYPE, BIND(C) :: MPI_Comm\n\
         \x20       INTEGER :: MPI_VAL\n\
         \x20   END TYPE MPI_Comm\n\
         \x20   TYPE(MPI_Comm), INTENT(IN) :: comm\n\
         \x20   INTEGER, INTENT(OUT) :: rank\n\
         \x20   INTEGER, OPTIONAL, INTENT(OUT) :: ierror\n\
         \x20   call mpi_comm_rank_c(comm%MPI_VAL, rank, c_ierror)\n\
         end subroutine\n\
         end module\n"
    );
}

#[test]
fn test_version_and_library_gating() {
    let records = parse_database(DATABASE).unwrap();
    let template = "#pragma pygen start where(\"p2p\" in tags)\n{mpi_name}\n#pragma pygen end\n";

    let calls = Enricher::from_config(&config(StandardVersion::new(4, 0)))
        .enrich(&records);
    let output = TemplateProcessor::new(&calls)
        .process_str(mpigen_generation::TemplateFamily::C, template)
        .unwrap();
    assert_eq!(output, "MPI_Send\nMPI_Isendrecv\n");

    let calls = Enricher::new(StandardVersion::new(4, 0)).enrich(&records);
    let output = TemplateProcessor::new(&calls)
        .process_str(mpigen_generation::TemplateFamily::C, template)
        .unwrap();
    assert_eq!(output, "MPI_Send\nMPI_Isendrecv\nMPI_Mprobe\n");
}

#[test]
fn test_f08_placeholder_on_call_without_f08_is_fatal() {
    let records = parse_database(DATABASE).unwrap();
    let calls = Enricher::new(StandardVersion::new(4, 0)).enrich(&records);

    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("all.f90.in");
    fs::write(&template, "!$PYGEN start\n{f08_arg_list}\n!$PYGEN end\n").unwrap();

    let err = TemplateProcessor::new(&calls)
        .process(&template, &dir.path().join("all.f90"))
        .unwrap_err();
    assert!(matches!(
        err,
        TemplateError::MissingAttribute { call, placeholder }
            if call == "MPI_Send" && placeholder == "f08_arg_list"
    ));
}

#[test]
fn test_unsupported_template_suffix() {
    let records = parse_database(DATABASE).unwrap();
    let calls = Enricher::new(StandardVersion::new(4, 0)).enrich(&records);

    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("bindings.txt");
    fs::write(&template, "text\n").unwrap();

    let err = TemplateProcessor::new(&calls)
        .process(&template, &dir.path().join("bindings.out"))
        .unwrap_err();
    assert!(matches!(err, TemplateError::UnsupportedSuffix { .. }));
    assert!(!dir.path().join("bindings.out").exists());
}
