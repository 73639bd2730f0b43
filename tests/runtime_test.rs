//! End-to-end fabrication against the bundled template set

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use prefab::{assemble, FabricationRuntime, PrefabError, RuntimeParameters, SpecLoader};

const USERS: &str = r#"
dao:
  table_name: users
  identity_field: id
  http_route: /users
  properties:
    id:
      nullable: false
    name:
      nullable: false
    bio:
      nullable: true
"#;

fn bundled_templates() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/templates")
}

fn runtime(output_root: &Path) -> FabricationRuntime {
    FabricationRuntime::new(RuntimeParameters {
        template_root: bundled_templates(),
        output_root: output_root.to_path_buf(),
        project_name: "Acme".to_string(),
        namespace_prefix: "Neighborhoods".to_string(),
    })
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

#[test]
fn test_complete_entity_against_bundled_templates() {
    let temp_dir = TempDir::new().unwrap();
    let record = SpecLoader::new("Acme")
        .load_from_str(Path::new("/app/src/Users/User.prefab.definition.yml"), USERS)
        .unwrap();
    let tree = assemble(&record).unwrap();

    let fabricated = runtime(temp_dir.path()).fabricate(&tree, &record.entity).unwrap();
    let user_dir = temp_dir.path().join("Users/User");
    assert_eq!(fabricated.directory, user_dir);
    assert_eq!(fabricated.files.len(), 11);

    let builder = read(user_dir.join("Builder.php"));
    assert!(builder.contains("namespace Neighborhoods\\Acme\\Users\\User;"));
    assert!(builder.contains("    protected $name;\n"));
    assert!(builder.contains("    public function setBio($bio = null) : self"));
    assert!(builder.contains("throw new \\LogicException('Name has not been set.');"));

    let handler = read(user_dir.join("Map/Repository/Handler.php"));
    assert!(handler.contains("    use \\Neighborhoods\\Acme\\Prefab5\\Psr\\Http\\Message\\ServerRequest\\AwareTrait;\n"));
    assert!(handler.contains("    use \\Neighborhoods\\Acme\\Prefab5\\SearchCriteria\\ServerRequest\\Builder\\Factory\\AwareTrait;\n"));

    let handler_interface = read(user_dir.join("Map/Repository/HandlerInterface.php"));
    assert!(handler_interface.contains("    public const ROUTE_PATH_USERS_USER = '/users';\n"));
    assert!(handler_interface.contains("    public const ROUTE_NAME_USERS_USER = 'UsersUser';\n"));

    let repository = read(user_dir.join("Map/Repository.php"));
    assert!(repository.contains("use Neighborhoods\\Acme\\Prefab5\\Doctrine;\n"));
    assert!(repository.contains("use Neighborhoods\\Acme\\Prefab5\\SearchCriteria;\n"));
    assert!(repository.contains("        $updateQueryBuilder->where(\n"));
    assert!(repository.contains("createNamedParameter($record['id'])"));

    let repository_service = read(user_dir.join("Map/Repository.service.yml"));
    assert!(repository_service.contains(
        "      - [setDoctrineDBALConnectionDecoratorRepository, ['@Neighborhoods\\Acme\\Prefab5\\Doctrine\\DBAL\\Connection\\Decorator\\RepositoryInterface']]\n"
    ));
    let parsed: serde_yaml::Value = serde_yaml::from_str(&repository_service).unwrap();
    assert!(parsed.get("services").is_some());

    for entry in WalkDir::new(&user_dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            let contents = read(entry.path().to_path_buf());
            assert!(!contents.contains("@prefab:"), "marker left in {}", entry.path().display());
            assert!(!contents.contains("<EntityName>"), "token left in {}", entry.path().display());
            assert!(!contents.contains("PROJECTNAME"), "project token left in {}", entry.path().display());
        }
    }
}

#[test]
fn test_entity_without_identity_or_route() {
    let temp_dir = TempDir::new().unwrap();
    let record = SpecLoader::new("Acme")
        .load_from_str(
            Path::new("/app/src/Tag.prefab.definition.yml"),
            "table_name: tags\nproperties:\n  label: {nullable: false}\n",
        )
        .unwrap();
    let tree = assemble(&record).unwrap();

    let fabricated = runtime(temp_dir.path()).fabricate(&tree, &record.entity).unwrap();
    assert_eq!(fabricated.directory, temp_dir.path().join("Tag"));
    assert_eq!(fabricated.files.len(), 10);

    let repository = read(temp_dir.path().join("Tag/Map/Repository.php"));
    assert!(!repository.contains("->where("));
    assert!(!temp_dir.path().join("Tag/Map/Repository/HandlerInterface.php").exists());
}

#[test]
fn test_minimal_group_renders_three_actors() {
    let temp_dir = TempDir::new().unwrap();
    let record = SpecLoader::new("Acme")
        .load_from_str(
            Path::new("/app/src/Tag.prefab.definition.yml"),
            "table_name: tags\nsupporting_actor_group: minimal\nproperties:\n  label: {nullable: true}\n",
        )
        .unwrap();
    let tree = assemble(&record).unwrap();

    let fabricated = runtime(temp_dir.path()).fabricate(&tree, &record.entity).unwrap();
    let mut names: Vec<String> = fabricated
        .files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["AwareTrait.php", "Builder.php", "Factory.php"]);
}

#[test]
fn test_missing_template_root_fails_before_writing() {
    let temp_dir = TempDir::new().unwrap();
    let record = SpecLoader::new("Acme")
        .load_from_str(Path::new("/app/src/Users/User.prefab.definition.yml"), USERS)
        .unwrap();
    let tree = assemble(&record).unwrap();

    let runtime = FabricationRuntime::new(RuntimeParameters {
        template_root: temp_dir.path().join("no-templates"),
        output_root: temp_dir.path().join("fab"),
        project_name: "Acme".to_string(),
        namespace_prefix: "Neighborhoods".to_string(),
    });

    let err = runtime.fabricate(&tree, &record.entity).unwrap_err();
    assert!(matches!(err, PrefabError::TemplateResolution { .. }));
    assert!(!temp_dir.path().join("fab").exists());
}
