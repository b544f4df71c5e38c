//! Certificate issuer manifest rendering

use anyhow::{Result, anyhow};

/// Name of the issuer binding the server ingress to the CA
pub const CA_ISSUER_NAME: &str = "uyuni-ca-issuer";
/// Bootstrap issuer used only to self-sign the generated CA
pub const SELF_SIGNED_ISSUER_NAME: &str = "uyuni-issuer";
/// Secret (and later configmap) holding the CA certificate
pub const CA_SECRET_NAME: &str = "uyuni-ca";

/// Parameters of the issuer manifest.
///
/// With CA material set, the manifest republishes it as a TLS secret and
/// issues from it directly. Without, cert-manager generates a self-signed
/// CA carrying the subject fields below.
#[derive(Debug, Clone, Default)]
pub struct IssuerData {
    pub namespace: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub org: String,
    pub org_unit: String,
    pub email: String,
    pub fqdn: String,
    /// base64 encoded PEM, empty to generate a CA
    pub root_ca: String,
    pub certificate: String,
    pub key: String,
}

impl IssuerData {
    pub fn render(&self) -> Result<String> {
        if self.namespace.is_empty() {
            return Err(anyhow!("Issuer manifest requires a namespace"));
        }
        if self.fqdn.is_empty() {
            return Err(anyhow!("Issuer manifest requires the server FQDN"));
        }

        let reuse_ca = !self.root_ca.is_empty();
        if reuse_ca && (self.certificate.is_empty() || self.key.is_empty()) {
            return Err(anyhow!(
                "Reusing a CA requires the certificate and key along with the root certificate"
            ));
        }

        let mut out = if reuse_ca {
            self.render_ca_secret()
        } else {
            self.render_generated_ca()
        };

        // The issuer all server certificates are requested from
        out.push_str(&format!(
            r#"---
apiVersion: cert-manager.io/v1
kind: Issuer
metadata:
  name: {CA_ISSUER_NAME}
  namespace: {namespace}
spec:
  ca:
    secretName: {CA_SECRET_NAME}
"#,
            namespace = self.namespace,
        ));

        Ok(out)
    }

    fn render_ca_secret(&self) -> String {
        format!(
            r#"apiVersion: v1
kind: Secret
type: kubernetes.io/tls
metadata:
  name: {CA_SECRET_NAME}
  namespace: {namespace}
data:
  ca.crt: {root_ca}
  tls.crt: {certificate}
  tls.key: {key}
"#,
            namespace = self.namespace,
            root_ca = self.root_ca,
            certificate = self.certificate,
            key = self.key,
        )
    }

    fn render_generated_ca(&self) -> String {
        let mut out = format!(
            r#"apiVersion: cert-manager.io/v1
kind: Issuer
metadata:
  name: {SELF_SIGNED_ISSUER_NAME}
  namespace: {namespace}
spec:
  selfSigned: {{}}
---
apiVersion: cert-manager.io/v1
kind: Certificate
metadata:
  name: {CA_SECRET_NAME}
  namespace: {namespace}
spec:
  isCA: true
"#,
            namespace = self.namespace,
        );

        let mut subject = String::new();
        push_subject_list(&mut subject, "countries", &self.country);
        push_subject_list(&mut subject, "provinces", &self.state);
        push_subject_list(&mut subject, "localities", &self.city);
        push_subject_list(&mut subject, "organizations", &self.org);
        push_subject_list(&mut subject, "organizationalUnits", &self.org_unit);
        if !subject.is_empty() {
            out.push_str("  subject:\n");
            out.push_str(&subject);
        }
        if !self.email.is_empty() {
            out.push_str(&format!("  emailAddresses:\n    - {}\n", self.email));
        }

        out.push_str(&format!(
            r#"  commonName: {fqdn}
  dnsNames:
    - {fqdn}
  secretName: {CA_SECRET_NAME}
  privateKey:
    algorithm: ECDSA
    size: 256
  issuerRef:
    name: {SELF_SIGNED_ISSUER_NAME}
    kind: Issuer
"#,
            fqdn = self.fqdn,
        ));

        out
    }
}

fn push_subject_list(out: &mut String, field: &str, value: &str) {
    if !value.is_empty() {
        out.push_str(&format!("    {}:\n      - {}\n", field, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated_data() -> IssuerData {
        IssuerData {
            namespace: "default".to_string(),
            country: "DE".to_string(),
            state: "Bayern".to_string(),
            city: "Nuernberg".to_string(),
            org: "Uyuni".to_string(),
            org_unit: "Uyuni".to_string(),
            email: "admin@example.com".to_string(),
            fqdn: "srv.example.com".to_string(),
            ..Default::default()
        }
    }

    fn parse_documents(rendered: &str) -> Vec<serde_yaml::Value> {
        rendered
            .split("---\n")
            .filter(|doc| !doc.trim().is_empty())
            .map(|doc| serde_yaml::from_str(doc).expect("invalid YAML document"))
            .collect()
    }

    #[test]
    fn test_generated_ca_chain() {
        let rendered = generated_data().render().unwrap();
        let docs = parse_documents(&rendered);

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0]["kind"], "Issuer");
        assert_eq!(docs[0]["metadata"]["name"], SELF_SIGNED_ISSUER_NAME);
        assert_eq!(docs[1]["kind"], "Certificate");
        assert_eq!(docs[1]["spec"]["isCA"], true);
        assert_eq!(docs[1]["spec"]["commonName"], "srv.example.com");
        assert_eq!(docs[1]["spec"]["subject"]["countries"][0], "DE");
        assert_eq!(docs[2]["metadata"]["name"], CA_ISSUER_NAME);
        assert_eq!(docs[2]["spec"]["ca"]["secretName"], CA_SECRET_NAME);
    }

    #[test]
    fn test_existing_ca_renders_secret() {
        let data = IssuerData {
            root_ca: "Y2EgcGVt".to_string(),
            certificate: "Y3J0IHBlbQ==".to_string(),
            key: "a2V5IHBlbQ==".to_string(),
            ..generated_data()
        };
        let rendered = data.render().unwrap();
        let docs = parse_documents(&rendered);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["kind"], "Secret");
        assert_eq!(docs[0]["data"]["ca.crt"], "Y2EgcGVt");
        assert_eq!(docs[1]["kind"], "Issuer");
        // No self-signed bootstrap issuer when the CA is provided
        assert!(!rendered.contains(SELF_SIGNED_ISSUER_NAME));
    }

    #[test]
    fn test_missing_fqdn_is_fatal() {
        let data = IssuerData {
            fqdn: String::new(),
            ..generated_data()
        };
        assert!(data.render().is_err());
    }

    #[test]
    fn test_partial_ca_material_is_fatal() {
        let data = IssuerData {
            root_ca: "Y2EgcGVt".to_string(),
            ..generated_data()
        };
        assert!(data.render().is_err());
    }

    #[test]
    fn test_empty_subject_fields_are_omitted() {
        let data = IssuerData {
            country: String::new(),
            state: String::new(),
            city: String::new(),
            org: String::new(),
            org_unit: String::new(),
            email: String::new(),
            ..generated_data()
        };
        let rendered = data.render().unwrap();
        assert!(!rendered.contains("subject:"));
        assert!(!rendered.contains("emailAddresses"));
        parse_documents(&rendered);
    }
}
