//! Built-in taxonomy used when no taxonomy file is configured

use super::loader::TaxonomyEntry;
use super::SkillCategory;
use SkillCategory::*;

type BuiltinSkill = (&'static str, SkillCategory, &'static [&'static str]);

const SKILLS: &[BuiltinSkill] = &[
    // Languages
    ("Python", Language, &["py"]),
    ("Java", Language, &[]),
    ("JavaScript", Language, &["js"]),
    ("TypeScript", Language, &["ts"]),
    ("C++", Language, &["cpp"]),
    ("C#", Language, &["csharp"]),
    ("Go", Language, &["golang"]),
    ("Rust", Language, &[]),
    ("Ruby", Language, &[]),
    ("PHP", Language, &[]),
    ("Swift", Language, &[]),
    ("Kotlin", Language, &[]),
    ("Scala", Language, &[]),
    ("R", Language, &[]),
    ("MATLAB", Language, &[]),
    ("SQL", Language, &[]),
    ("C", Language, &[]),
    ("Perl", Language, &[]),
    ("Shell Scripting", Language, &[]),
    ("Bash", Language, &[]),
    ("PowerShell", Language, &[]),
    ("Solidity", Language, &[]),
    ("HTML", Language, &["html5"]),
    ("CSS", Language, &["css3"]),
    ("Sass", Language, &["scss"]),
    // Frameworks and libraries
    ("TensorFlow", Framework, &[]),
    ("PyTorch", Framework, &[]),
    ("Keras", Framework, &[]),
    ("scikit-learn", Framework, &["sklearn"]),
    ("XGBoost", Framework, &[]),
    ("LightGBM", Framework, &[]),
    ("Transformers", Framework, &[]),
    ("Hugging Face", Framework, &["huggingface"]),
    ("LangChain", Framework, &[]),
    ("OpenCV", Framework, &[]),
    ("pandas", Framework, &[]),
    ("NumPy", Framework, &[]),
    ("Apache Spark", Framework, &["spark", "pyspark"]),
    ("Hadoop", Framework, &[]),
    ("React", Framework, &["react.js", "reactjs"]),
    ("Angular", Framework, &[]),
    ("Vue", Framework, &["vue.js", "vuejs"]),
    ("Svelte", Framework, &[]),
    ("Node.js", Framework, &["nodejs", "node"]),
    ("Django", Framework, &[]),
    ("Flask", Framework, &[]),
    ("FastAPI", Framework, &[]),
    ("Spring Boot", Framework, &["spring"]),
    ("Express", Framework, &["express.js"]),
    ("Next.js", Framework, &["nextjs"]),
    ("Nuxt", Framework, &[]),
    ("Gatsby", Framework, &[]),
    ("Tailwind", Framework, &["tailwind css"]),
    ("React Native", Framework, &[]),
    ("Flutter", Framework, &[]),
    // Databases and data stores
    ("NoSQL", Database, &[]),
    ("MongoDB", Database, &["mongo"]),
    ("PostgreSQL", Database, &["postgres"]),
    ("MySQL", Database, &[]),
    ("Redis", Database, &[]),
    ("Cassandra", Database, &[]),
    ("Elasticsearch", Database, &[]),
    ("BigQuery", Database, &[]),
    ("Snowflake", Database, &[]),
    ("Redshift", Database, &[]),
    ("Presto", Database, &[]),
    ("Hive", Database, &[]),
    ("Data Warehouse", Database, &["data warehousing"]),
    // Tools
    ("Kafka", Tool, &["apache kafka"]),
    ("Airflow", Tool, &["apache airflow"]),
    ("dbt", Tool, &[]),
    ("Tableau", Tool, &[]),
    ("Power BI", Tool, &["powerbi"]),
    ("Looker", Tool, &[]),
    ("Docker", Tool, &[]),
    ("Jenkins", Tool, &[]),
    ("Terraform", Tool, &[]),
    ("Ansible", Tool, &[]),
    ("Helm", Tool, &[]),
    ("Istio", Tool, &[]),
    ("Prometheus", Tool, &[]),
    ("Grafana", Tool, &[]),
    ("ELK Stack", Tool, &["elk"]),
    ("Datadog", Tool, &[]),
    ("Argo CD", Tool, &["argocd"]),
    ("Git", Tool, &[]),
    ("GitHub", Tool, &[]),
    ("GitLab", Tool, &[]),
    ("Bitbucket", Tool, &[]),
    ("Jira", Tool, &[]),
    ("Confluence", Tool, &[]),
    ("Slack", Tool, &[]),
    ("Jupyter", Tool, &["jupyter notebook"]),
    ("VS Code", Tool, &["visual studio code"]),
    ("IntelliJ", Tool, &[]),
    ("PyCharm", Tool, &[]),
    ("Vim", Tool, &[]),
    ("Postman", Tool, &[]),
    ("Swagger", Tool, &["openapi"]),
    ("Figma", Tool, &[]),
    // Platforms
    ("AWS", Platform, &["amazon web services"]),
    ("Azure", Platform, &["microsoft azure"]),
    ("GCP", Platform, &["google cloud", "google cloud platform"]),
    ("Kubernetes", Platform, &["k8s"]),
    ("AWS Lambda", Platform, &["lambda"]),
    ("EC2", Platform, &[]),
    ("S3", Platform, &[]),
    ("CloudFormation", Platform, &[]),
    ("Azure DevOps", Platform, &[]),
    ("GitHub Actions", Platform, &[]),
    ("GitLab CI", Platform, &[]),
    ("CI/CD", Platform, &["continuous integration", "continuous delivery"]),
    ("Linux", Platform, &[]),
    ("Unix", Platform, &[]),
    ("iOS", Platform, &[]),
    ("Android", Platform, &[]),
    // Soft skills
    ("Leadership", SoftSkill, &[]),
    ("Team Management", SoftSkill, &[]),
    ("Communication", SoftSkill, &[]),
    ("Problem Solving", SoftSkill, &[]),
    ("Project Management", SoftSkill, &[]),
    ("Stakeholder Management", SoftSkill, &[]),
    ("Mentoring", SoftSkill, &[]),
    ("Collaboration", SoftSkill, &[]),
    ("Strategic Thinking", SoftSkill, &[]),
    ("Cross-functional Collaboration", SoftSkill, &["cross-functional"]),
    ("Presentation", SoftSkill, &["public speaking"]),
    ("Technical Writing", SoftSkill, &[]),
    ("Coaching", SoftSkill, &[]),
    ("Conflict Resolution", SoftSkill, &[]),
    ("Time Management", SoftSkill, &[]),
    ("Critical Thinking", SoftSkill, &[]),
    ("Agile", SoftSkill, &[]),
    ("Scrum", SoftSkill, &[]),
    ("Kanban", SoftSkill, &[]),
    // Domains
    ("Machine Learning", Domain, &["ml"]),
    ("Deep Learning", Domain, &["dl"]),
    ("NLP", Domain, &["natural language processing"]),
    ("Computer Vision", Domain, &["cv"]),
    ("Neural Networks", Domain, &[]),
    ("LLM", Domain, &["large language model", "large language models", "llms"]),
    ("BERT", Domain, &[]),
    ("GPT", Domain, &[]),
    ("CNN", Domain, &["convolutional neural networks"]),
    ("RNN", Domain, &["recurrent neural networks"]),
    ("LSTM", Domain, &[]),
    ("Reinforcement Learning", Domain, &[]),
    ("Generative AI", Domain, &["genai"]),
    ("Stable Diffusion", Domain, &[]),
    ("ETL", Domain, &[]),
    ("Data Analysis", Domain, &["data analytics"]),
    ("Data Visualization", Domain, &[]),
    ("Data Engineering", Domain, &[]),
    ("Data Modeling", Domain, &[]),
    ("DevOps", Domain, &[]),
    ("REST API", Domain, &["rest", "restful api", "restful apis"]),
    ("GraphQL", Domain, &[]),
    ("gRPC", Domain, &[]),
    ("Responsive Design", Domain, &[]),
    ("Mobile Development", Domain, &[]),
    ("PWA", Domain, &["progressive web apps"]),
    ("Blockchain", Domain, &[]),
    ("Web3", Domain, &[]),
    ("Smart Contracts", Domain, &[]),
    ("Cryptocurrency", Domain, &[]),
    ("Cybersecurity", Domain, &["security"]),
    ("Penetration Testing", Domain, &["pentesting"]),
    ("SIEM", Domain, &[]),
    ("SOC", Domain, &["security operations"]),
    ("IoT", Domain, &["internet of things"]),
    ("Edge Computing", Domain, &[]),
    ("5G", Domain, &[]),
    ("Quantum Computing", Domain, &[]),
    ("Robotics", Domain, &[]),
    ("Embedded Systems", Domain, &["embedded"]),
    ("Microservices", Domain, &[]),
    ("Event-Driven Architecture", Domain, &["event-driven"]),
    ("Distributed Systems", Domain, &[]),
    ("High Availability", Domain, &[]),
    ("Scalability", Domain, &[]),
];

pub fn entries() -> Vec<TaxonomyEntry> {
    SKILLS
        .iter()
        .map(|(name, category, aliases)| TaxonomyEntry::new(name, *category, aliases))
        .collect()
}
