//! Test: partial files are never entries for any pipeline

use crate::helpers::*;
use sitepipe::site::build_command;
use sitepipe::BuildEnvironment;

fn fixture_with_partials() -> SiteFixture {
    let fixture = SiteFixture::standard();
    fixture.write("templates/pages/_draft.njk", "<p>draft</p>");
    fixture.write("templates/pages/blog/_sidebar.html", "<aside></aside>");
    fixture.write("templates/pages/blog/post.html", "<article>post</article>");
    fixture.write("styles/_print.scss", "body { color: black; }");
    fixture.write("scripts/_unused.js", "export default 1;");
    fixture.write("images/icons/_old.svg", "<svg/>");
    fixture
}

#[tokio::test]
async fn test_no_partial_outputs() {
    for env in [BuildEnvironment::Development, BuildEnvironment::Production] {
        let fixture = fixture_with_partials();
        fixture.engine(env).run(build_command()).await.unwrap();

        let outputs = fixture.outputs();
        assert!(outputs.contains(&"blog/post.html".to_string()), "{:?}", outputs);
        for output in &outputs {
            let name = output.rsplit('/').next().unwrap_or_default();
            assert!(!name.starts_with('_'), "partial {} was built in {}", output, env);
        }
        assert!(!outputs.iter().any(|o| o.contains("draft") || o.contains("sidebar")));
    }
}
